//! Foreground/background decision and background child bookkeeping.

use nix::unistd::Pid;
use tracing::{debug, info};

use crate::error::{Result, ShellError};
use crate::launcher::{ChildHandle, ChildStatus};

const BACKGROUND_MARKER: char = '&';
const FOREGROUND_MARKER: char = ';';

/// Whether the loop blocks on the child before the next prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    Wait,
    Background,
}

impl WaitPolicy {
    /// Scan the untokenized line for the first `&` or `;`.
    ///
    /// `&` first means background; `;` first, or neither, means wait.
    pub fn from_line(line: &str) -> Self {
        for c in line.chars() {
            match c {
                BACKGROUND_MARKER => return WaitPolicy::Background,
                FOREGROUND_MARKER => return WaitPolicy::Wait,
                _ => {}
            }
        }
        WaitPolicy::Wait
    }

    pub fn should_wait(self) -> bool {
        self == WaitPolicy::Wait
    }
}

/// Drop a final standalone `&` so the program never sees it as an argument.
///
/// Every other token, `;` and glued `&` included, is passed through as typed.
/// A standalone `&` before the last token would start a second command,
/// which is not supported.
pub fn strip_background_marker(argv: &mut Vec<String>) -> Result<()> {
    let marker = BACKGROUND_MARKER.to_string();
    if let Some(last) = argv.iter().rposition(|t| *t == marker) {
        if last + 1 != argv.len() || argv[..last].contains(&marker) {
            return Err(ShellError::UnexpectedToken(marker));
        }
        argv.pop();
    }
    if argv.is_empty() {
        return Err(ShellError::MissingCommand);
    }
    Ok(())
}

/// Background children that have not been reaped yet.
#[derive(Debug, Default)]
pub struct BackgroundJobs {
    children: Vec<ChildHandle>,
}

impl BackgroundJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, child: ChildHandle) {
        info!(pid = %child.pid(), "started background process");
        self.children.push(child);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.children.iter().map(ChildHandle::pid)
    }

    /// Collect every tracked child that has terminated, without blocking.
    ///
    /// Children whose status cannot be queried are dropped from tracking.
    pub fn reap(&mut self) -> Vec<(Pid, ChildStatus)> {
        let mut finished = Vec::new();
        self.children.retain(|child| match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!(pid = %child.pid(), ?status, "reaped background process");
                finished.push((child.pid(), status));
                false
            }
            Err(err) => {
                debug!(pid = %child.pid(), %err, "lost track of background process");
                false
            }
        });
        finished
    }
}
