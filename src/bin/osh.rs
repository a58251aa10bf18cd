use std::env;
use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use argh::FromArgs;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use osh::config::{DEFAULT_MAX_ARGS, DEFAULT_MAX_LINE_LEN, DEFAULT_PROMPT};
use osh::{EditorSource, InputMode, OutputMode, ReaderSource, Shell, ShellConfig};

#[derive(FromArgs)]
/// A minimal command interpreter: runs one program per line, with `<`, `>`,
/// `&` and `!!`.
struct Args {
    /// prompt shown before each line
    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    prompt: String,

    /// append to existing files on `>` instead of truncating them
    #[argh(switch)]
    append: bool,

    /// create missing files on `<` instead of failing
    #[argh(switch)]
    create_missing_input: bool,

    /// longest accepted input line in bytes
    #[argh(option, default = "DEFAULT_MAX_LINE_LEN")]
    max_line: usize,

    /// most arguments kept from one line
    #[argh(option, default = "DEFAULT_MAX_ARGS")]
    max_args: usize,

    /// log at debug level unless RUST_LOG says otherwise
    #[argh(switch)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> ShellConfig {
        ShellConfig {
            prompt: self.prompt,
            max_line_len: self.max_line,
            max_args: self.max_args,
            output_mode: if self.append {
                OutputMode::Append
            } else {
                OutputMode::Truncate
            },
            input_mode: if self.create_missing_input {
                InputMode::CreateMissing
            } else {
                InputMode::Strict
            },
            ..ShellConfig::default()
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    init_logging(args.debug);

    let mut shell = Shell::new(args.into_config());
    debug!(config = ?shell.config(), "starting");

    let result = if io::stdin().is_terminal() {
        let mut source = EditorSource::new().context("failed to open line editor")?;
        shell.run(&mut source)
    } else {
        let mut source = ReaderSource::new(io::stdin().lock(), io::stdout());
        shell.run(&mut source)
    };

    if let Err(err) = &result {
        error!(%err, "interpreter stopped");
    }
    result.context("osh stopped")
}
