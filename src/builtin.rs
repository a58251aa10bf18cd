//! Commands that must run inside the interpreter process itself.

use std::env;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{Result, ShellError};

pub const CD: &str = "cd";

pub fn is_builtin(name: &str) -> bool {
    name == CD
}

/// Run a builtin. `argv[0]` must satisfy [`is_builtin`].
pub fn run(argv: &[String]) -> Result<()> {
    match argv.first().map(String::as_str) {
        Some(CD) => change_directory(argv.get(1).map(String::as_str)),
        _ => Err(ShellError::MissingCommand),
    }
}

/// Change the interpreter's working directory, defaulting to `$HOME`.
fn change_directory(target: Option<&str>) -> Result<()> {
    let target = match target {
        Some(dir) => PathBuf::from(dir),
        None => env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or(ShellError::NoHomeDirectory)?,
    };
    env::set_current_dir(&target).map_err(|source| ShellError::ChangeDirectory {
        path: target.display().to_string(),
        source,
    })?;
    debug!(dir = %target.display(), "changed directory");
    Ok(())
}
