//! Pulls `<` and `>` out of an argument vector.
//!
//! Planning is pure: files are only opened later, inside the child.

use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use tracing::debug;

use crate::config::{InputMode, OutputMode};
use crate::error::{Result, ShellError};

pub const INPUT_OPERATOR: &str = "<";
pub const OUTPUT_OPERATOR: &str = ">";

/// Which standard stream a redirection rebinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            INPUT_OPERATOR => Some(Direction::Input),
            OUTPUT_OPERATOR => Some(Direction::Output),
            _ => None,
        }
    }

    fn operator(self) -> &'static str {
        match self {
            Direction::Input => INPUT_OPERATOR,
            Direction::Output => OUTPUT_OPERATOR,
        }
    }
}

/// One pending redirection: the file to open and how to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub direction: Direction,
    pub path: String,
    pub flags: OFlag,
    pub mode: Mode,
}

impl Redirection {
    fn new(direction: Direction, path: String, options: &PlanOptions) -> Self {
        let flags = match direction {
            Direction::Input => match options.input {
                InputMode::Strict => OFlag::O_RDONLY,
                InputMode::CreateMissing => OFlag::O_RDONLY | OFlag::O_CREAT,
            },
            Direction::Output => {
                let keep = match options.output {
                    OutputMode::Truncate => OFlag::O_TRUNC,
                    OutputMode::Append => OFlag::O_APPEND,
                };
                OFlag::O_WRONLY | OFlag::O_CREAT | keep
            }
        };
        Self {
            direction,
            path,
            flags: flags | OFlag::O_CLOEXEC,
            mode: Mode::from_bits_truncate(0o644),
        }
    }
}

/// At most one input and one output redirection per command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectionPlan {
    pub input: Option<Redirection>,
    pub output: Option<Redirection>,
}

impl RedirectionPlan {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }

    /// Pending redirections, input first.
    pub fn iter(&self) -> impl Iterator<Item = &Redirection> {
        self.input.iter().chain(self.output.iter())
    }

    fn slot(&mut self, direction: Direction) -> &mut Option<Redirection> {
        match direction {
            Direction::Input => &mut self.input,
            Direction::Output => &mut self.output,
        }
    }
}

/// Open modes applied to planned files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    pub input: InputMode,
    pub output: OutputMode,
}

/// An argument vector with its redirections removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Planned {
    pub argv: Vec<String>,
    pub plan: RedirectionPlan,
}

/// Scan `argv` left to right, moving every `< path` and `> path` pair into
/// the plan.
///
/// Fails without planning anything when an operator has no file operand,
/// when a direction is redirected twice, or when no program is left over.
pub fn plan(argv: Vec<String>, options: &PlanOptions) -> Result<Planned> {
    let mut plan = RedirectionPlan::default();
    let mut kept = Vec::with_capacity(argv.len());
    let mut tokens = argv.into_iter();

    while let Some(token) = tokens.next() {
        let Some(direction) = Direction::from_token(&token) else {
            kept.push(token);
            continue;
        };
        let path = tokens
            .next()
            .ok_or_else(|| ShellError::MissingRedirectTarget(token.clone()))?;
        if Direction::from_token(&path).is_some() {
            return Err(ShellError::UnexpectedToken(path));
        }
        let slot = plan.slot(direction);
        if slot.is_some() {
            return Err(ShellError::DuplicateRedirection(direction.operator().to_string()));
        }
        debug!(?direction, %path, "planned redirection");
        *slot = Some(Redirection::new(direction, path, options));
    }

    if kept.is_empty() {
        return Err(ShellError::MissingCommand);
    }
    Ok(Planned { argv: kept, plan })
}
