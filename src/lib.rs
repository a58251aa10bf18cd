//! A small line-oriented command interpreter.
//!
//! Each line goes through the same stages: [`tokenizer`] splits it,
//! [`history`] resolves `!!`, [`redirect`] extracts `<`/`>`, [`launcher`]
//! forks and execs the child, and [`scheduler`] decides whether the parent
//! waits. [`repl::Shell`] ties the stages into a prompt loop.

pub mod builtin;
pub mod config;
pub mod error;
pub mod history;
pub mod launcher;
pub mod redirect;
pub mod repl;
pub mod scheduler;
pub mod tokenizer;

pub use config::{InputMode, OutputMode, ShellConfig};
pub use error::{Result, ShellError};
pub use repl::{EditorSource, LineSource, ReaderSource, Shell, Step};
