//! Forks the child, applies redirections in it and replaces its image.

use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::fmt;
use std::io::{self, Write};
use std::os::unix::io::RawFd;

use nix::errno::Errno;
use nix::fcntl::{fcntl, open, FcntlArg, FdFlag, OFlag};
use nix::libc::{self, _exit};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{close, dup2, execvp, fork, ForkResult, Pid};
use tracing::debug;

use crate::error::{Result, ShellError};
use crate::redirect::{Direction, Planned, Redirection};

/// Child exit status when a redirection could not be applied.
pub const REDIRECT_FAILURE_STATUS: i32 = 1;
/// Child exit status when the program could not be found.
pub const NOT_FOUND_STATUS: i32 = 127;
/// Child exit status when the program was found but could not be run.
pub const NOT_EXECUTABLE_STATUS: i32 = 126;

/// How a child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus {
    Exited(i32),
    Signaled(i32),
}

impl ChildStatus {
    pub fn success(self) -> bool {
        self == ChildStatus::Exited(0)
    }

    fn from_wait(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(ChildStatus::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(ChildStatus::Signaled(signal as i32)),
            _ => None,
        }
    }
}

impl fmt::Display for ChildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildStatus::Exited(0) => write!(f, "Done"),
            ChildStatus::Exited(code) => write!(f, "Exit {code}"),
            ChildStatus::Signaled(signal) => write!(f, "Killed by signal {signal}"),
        }
    }
}

/// Parent-side handle on a running child.
#[derive(Debug)]
pub struct ChildHandle {
    pid: Pid,
}

impl ChildHandle {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Block until this child (and only this child) terminates.
    pub fn wait(self) -> Result<ChildStatus> {
        loop {
            match waitpid(self.pid, None) {
                Ok(status) => {
                    if let Some(status) = ChildStatus::from_wait(status) {
                        debug!(pid = %self.pid, ?status, "child finished");
                        return Ok(status);
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(source) => {
                    return Err(ShellError::Wait {
                        pid: self.pid.as_raw(),
                        source,
                    })
                }
            }
        }
    }

    /// Collect the child's status if it has already terminated.
    pub fn try_wait(&self) -> Result<Option<ChildStatus>> {
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(status) => Ok(ChildStatus::from_wait(status)),
            Err(Errno::EINTR) => Ok(None),
            Err(source) => Err(ShellError::Wait {
                pid: self.pid.as_raw(),
                source,
            }),
        }
    }
}

/// A failure inside the child before its image was replaced.
pub trait ChildFailure: fmt::Display {
    fn exit_status(&self) -> i32;
}

/// Create one child process running `child_side`.
///
/// The parent gets the child's handle back immediately. The child runs
/// `child_side`, which must replace the process image on success; if it
/// returns an error instead, the error is written to stderr and the child
/// exits with the error's status without ever returning to the caller.
pub fn spawn<F, E>(child_side: F) -> Result<ChildHandle>
where
    F: FnOnce() -> std::result::Result<Infallible, E>,
    E: ChildFailure,
{
    // Pending prompt or job output must not interleave with the child's.
    let _ = io::stdout().flush();

    // Safety: the interpreter is single-threaded, and the child side only
    // opens files, duplicates descriptors and execs before exiting.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            debug!(pid = %child, "forked child");
            Ok(ChildHandle { pid: child })
        }
        Ok(ForkResult::Child) => {
            let failure = match child_side() {
                Ok(never) => match never {},
                Err(failure) => failure,
            };
            let _ = writeln!(io::stderr(), "osh: {failure}");
            unsafe { _exit(failure.exit_status()) }
        }
        Err(errno) => Err(ShellError::Fork(errno)),
    }
}

/// A redirection ready for the child: path already converted, target fd known.
#[derive(Debug)]
struct PreparedRedirection {
    target: RawFd,
    path: CString,
    flags: OFlag,
    mode: Mode,
}

impl PreparedRedirection {
    fn new(redirection: &Redirection) -> Result<Self> {
        let target = match redirection.direction {
            Direction::Input => libc::STDIN_FILENO,
            Direction::Output => libc::STDOUT_FILENO,
        };
        Ok(Self {
            target,
            path: to_cstring(&redirection.path)?,
            flags: redirection.flags,
            mode: redirection.mode,
        })
    }

    /// Open the file and make it the target stream, leaving no extra descriptor behind.
    fn apply(&self) -> std::result::Result<(), LaunchFailure<'_>> {
        let fail = |errno| LaunchFailure::Redirect {
            path: self.path.as_c_str(),
            errno,
        };
        let fd = open(self.path.as_c_str(), self.flags, self.mode).map_err(fail)?;
        if fd == self.target {
            // Opened straight onto the stream; drop close-on-exec so it survives exec.
            fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty())).map_err(fail)?;
            return Ok(());
        }
        dup2(fd, self.target).map_err(fail)?;
        close(fd).map_err(fail)?;
        Ok(())
    }
}

/// Everything the child needs, built in the parent before forking.
#[derive(Debug)]
struct PreparedCommand {
    argv: Vec<CString>,
    redirections: Vec<PreparedRedirection>,
}

impl PreparedCommand {
    fn new(planned: &Planned) -> Result<Self> {
        if planned.argv.is_empty() {
            return Err(ShellError::MissingCommand);
        }
        let argv = planned
            .argv
            .iter()
            .map(|arg| to_cstring(arg))
            .collect::<Result<Vec<_>>>()?;
        let redirections = planned
            .plan
            .iter()
            .map(PreparedRedirection::new)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { argv, redirections })
    }

    fn program(&self) -> &CStr {
        &self.argv[0]
    }

    /// Child side: redirect, then exec. Only returns on failure.
    fn exec(&self) -> std::result::Result<Infallible, LaunchFailure<'_>> {
        for redirection in &self.redirections {
            redirection.apply()?;
        }
        execvp(self.program(), &self.argv).map_err(|errno| LaunchFailure::Exec {
            program: self.program(),
            errno,
        })
    }
}

#[derive(Debug)]
enum LaunchFailure<'a> {
    Redirect { path: &'a CStr, errno: Errno },
    Exec { program: &'a CStr, errno: Errno },
}

impl fmt::Display for LaunchFailure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchFailure::Redirect { path, errno } => {
                write!(f, "{}: {}", path.to_string_lossy(), errno.desc())
            }
            LaunchFailure::Exec {
                program,
                errno: Errno::ENOENT,
            } => write!(f, "{}: command not found", program.to_string_lossy()),
            LaunchFailure::Exec { program, errno } => {
                write!(f, "{}: {}", program.to_string_lossy(), errno.desc())
            }
        }
    }
}

impl ChildFailure for LaunchFailure<'_> {
    fn exit_status(&self) -> i32 {
        match self {
            LaunchFailure::Redirect { .. } => REDIRECT_FAILURE_STATUS,
            LaunchFailure::Exec {
                errno: Errno::ENOENT,
                ..
            } => NOT_FOUND_STATUS,
            LaunchFailure::Exec { .. } => NOT_EXECUTABLE_STATUS,
        }
    }
}

fn to_cstring(arg: &str) -> Result<CString> {
    CString::new(arg).map_err(|_| ShellError::InvalidArgument(arg.to_string()))
}

/// Start `planned` as a child process and return without waiting for it.
pub fn launch(planned: &Planned) -> Result<ChildHandle> {
    let command = PreparedCommand::new(planned)?;
    debug!(argv = ?planned.argv, redirections = command.redirections.len(), "launching");
    spawn(|| command.exec())
}

/// Start a command with no redirections.
#[cfg(test)]
pub(crate) fn launch_argv(argv: &[String]) -> Result<ChildHandle> {
    launch(&Planned {
        argv: argv.to_vec(),
        plan: Default::default(),
    })
}
