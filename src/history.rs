//! One-entry command history and `!!` substitution.

use tracing::debug;

use crate::error::{Result, ShellError};

/// First token that asks for the previous command to be replayed.
pub const HISTORY_MARKER: &str = "!!";

/// Holds the most recent command, if any.
///
/// The stored tokens are owned copies, independent from the line they were
/// read from.
#[derive(Debug, Default, Clone)]
pub struct HistoryStore {
    last: Option<Vec<String>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&[String]> {
        self.last.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_none()
    }

    fn replace(&mut self, argv: &[String]) {
        self.last = Some(argv.to_vec());
    }
}

/// The command chosen for one loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub argv: Vec<String>,
    /// True when `argv` was replayed from history.
    pub from_history: bool,
}

/// Pick the command to run for a freshly tokenized line.
///
/// `!!` in first position discards the rest of the line and replays the
/// stored entry without touching it. Any other non-empty line becomes the
/// new history entry. Blank lines leave history alone.
pub fn resolve(argv: Vec<String>, history: &mut HistoryStore) -> Result<Resolved> {
    match argv.first().map(String::as_str) {
        None => Err(ShellError::EmptyCommand),
        Some(HISTORY_MARKER) => {
            let last = history.last().ok_or(ShellError::HistoryUnavailable)?;
            debug!(?last, "replaying previous command");
            Ok(Resolved {
                argv: last.to_vec(),
                from_history: true,
            })
        }
        Some(_) => {
            history.replace(&argv);
            Ok(Resolved {
                argv,
                from_history: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_owned).collect()
    }

    #[test]
    fn fresh_command_becomes_history() {
        let mut history = HistoryStore::new();
        let resolved = resolve(words("ls -l"), &mut history).unwrap();
        assert_eq!(resolved.argv, words("ls -l"));
        assert!(!resolved.from_history);
        assert_eq!(history.last(), Some(&words("ls -l")[..]));
    }

    #[test]
    fn bang_bang_replays_without_recording_itself() {
        let mut history = HistoryStore::new();
        resolve(words("ls -l"), &mut history).unwrap();

        for _ in 0..3 {
            let resolved = resolve(words("!!"), &mut history).unwrap();
            assert_eq!(resolved.argv, words("ls -l"));
            assert!(resolved.from_history);
            assert_eq!(history.last(), Some(&words("ls -l")[..]));
        }
    }

    #[test]
    fn bang_bang_with_empty_history_is_an_error() {
        let mut history = HistoryStore::new();
        let err = resolve(words("!!"), &mut history).unwrap_err();
        assert!(matches!(err, ShellError::HistoryUnavailable));
        assert!(history.is_empty());
    }

    #[test]
    fn bang_bang_discards_trailing_words() {
        let mut history = HistoryStore::new();
        resolve(words("echo hi"), &mut history).unwrap();
        let resolved = resolve(words("!! extra"), &mut history).unwrap();
        assert_eq!(resolved.argv, words("echo hi"));
    }

    #[test]
    fn bang_bang_only_counts_as_whole_first_token() {
        let mut history = HistoryStore::new();
        resolve(words("echo hi"), &mut history).unwrap();
        let resolved = resolve(words("echo !!"), &mut history).unwrap();
        assert_eq!(resolved.argv, words("echo !!"));
        assert_eq!(history.last(), Some(&words("echo !!")[..]));
    }

    #[test]
    fn new_command_replaces_previous_entry() {
        let mut history = HistoryStore::new();
        resolve(words("ls -l -a"), &mut history).unwrap();
        resolve(words("pwd"), &mut history).unwrap();
        assert_eq!(history.last(), Some(&words("pwd")[..]));
    }

    #[test]
    fn empty_line_keeps_history() {
        let mut history = HistoryStore::new();
        resolve(words("pwd"), &mut history).unwrap();
        let err = resolve(Vec::new(), &mut history).unwrap_err();
        assert!(matches!(err, ShellError::EmptyCommand));
        assert_eq!(history.last(), Some(&words("pwd")[..]));
    }
}
