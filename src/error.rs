//! Error types for the interpreter.

use std::io;

use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, ShellError>;

/// Everything that can go wrong while turning a line into a running process.
#[derive(Debug, Error)]
pub enum ShellError {
    /// `<` or `>` was the last token.
    #[error("syntax error: missing file path for redirection `{0}`")]
    MissingRedirectTarget(String),

    /// A second `<` or a second `>` on the same line.
    #[error("syntax error: only one `{0}` redirection is supported per command")]
    DuplicateRedirection(String),

    /// An operator where a file path or program was expected.
    #[error("syntax error near unexpected token `{0}`")]
    UnexpectedToken(String),

    /// Redirections were given but no program to run.
    #[error("syntax error: no command to run")]
    MissingCommand,

    /// Blank input line.
    #[error("empty command")]
    EmptyCommand,

    #[error("No commands in history.")]
    HistoryUnavailable,

    /// An argument that cannot be handed to exec (interior NUL byte).
    #[error("invalid argument {0:?}: contains a NUL byte")]
    InvalidArgument(String),

    #[error("cd: {path}: {source}")]
    ChangeDirectory {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cd: HOME not set")]
    NoHomeDirectory,

    /// Creating the child failed; no child exists and the loop cannot go on.
    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),

    #[error("failed to wait on child {pid}: {source}")]
    Wait {
        pid: i32,
        #[source]
        source: nix::Error,
    },

    #[error("input error: {0}")]
    Io(#[from] io::Error),
}

impl ShellError {
    /// Fatal errors terminate the interpreter; everything else is reported
    /// and the loop moves on to the next prompt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::Fork(_) | ShellError::Io(_))
    }

    /// Errors that should not produce any user-visible report.
    pub fn is_silent(&self) -> bool {
        matches!(self, ShellError::EmptyCommand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_and_io_are_fatal() {
        assert!(ShellError::Fork(nix::Error::EAGAIN).is_fatal());
        assert!(ShellError::Io(io::Error::other("closed")).is_fatal());
        assert!(!ShellError::HistoryUnavailable.is_fatal());
        assert!(!ShellError::MissingRedirectTarget(">".into()).is_fatal());
    }

    #[test]
    fn history_message_matches_reference_wording() {
        assert_eq!(
            ShellError::HistoryUnavailable.to_string(),
            "No commands in history."
        );
    }
}
