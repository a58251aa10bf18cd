//! Interpreter configuration.

/// How `>` treats a file that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Replace the previous contents, like `>` in a POSIX shell.
    #[default]
    Truncate,
    /// Keep the previous contents and write after them.
    Append,
}

/// How `<` treats a file that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Missing input files are an error in the child.
    #[default]
    Strict,
    /// Create an empty file and read from it.
    CreateMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub prompt: String,
    /// Longest accepted input line in bytes; the rest is dropped.
    pub max_line_len: usize,
    /// Most tokens kept from one line; the rest are dropped.
    pub max_args: usize,
    pub output_mode: OutputMode,
    pub input_mode: InputMode,
    /// Command word that ends the loop. `None` leaves end-of-input as the only way out.
    pub exit_command: Option<String>,
}

pub const DEFAULT_PROMPT: &str = "osh> ";
pub const DEFAULT_MAX_LINE_LEN: usize = 1023;
pub const DEFAULT_MAX_ARGS: usize = 40;

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            max_args: DEFAULT_MAX_ARGS,
            output_mode: OutputMode::default(),
            input_mode: InputMode::default(),
            exit_command: Some("exit".to_string()),
        }
    }
}

impl ShellConfig {
    pub fn is_exit_command(&self, word: &str) -> bool {
        self.exit_command.as_deref() == Some(word)
    }
}
