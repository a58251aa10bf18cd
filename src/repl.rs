//! The read-eval loop and the line sources it reads from.

use std::io::{self, BufRead, Write};

use nix::unistd::Pid;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info};

use crate::builtin;
use crate::config::ShellConfig;
use crate::error::Result;
use crate::history::{resolve, HistoryStore};
use crate::launcher::{launch, ChildStatus};
use crate::redirect::{plan, PlanOptions};
use crate::scheduler::{strip_background_marker, BackgroundJobs, WaitPolicy};
use crate::tokenizer::{clean_line, tokenize};

/// Where input lines come from.
pub trait LineSource {
    /// Show `prompt` and read one line. `Ok(None)` means end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Interactive line editor on the terminal.
pub struct EditorSource {
    editor: DefaultEditor,
}

impl EditorSource {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().map_err(readline_to_io)?;
        Ok(Self { editor })
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            // Ctrl-C drops the line being typed.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(readline_to_io(err).into()),
        }
    }
}

fn readline_to_io(err: ReadlineError) -> io::Error {
    match err {
        ReadlineError::Io(err) => err,
        other => io::Error::other(other.to_string()),
    }
}

/// Plain buffered reader, for piped input and tests.
pub struct ReaderSource<R, W> {
    reader: R,
    prompt_out: W,
}

impl<R: BufRead, W: Write> ReaderSource<R, W> {
    pub fn new(reader: R, prompt_out: W) -> Self {
        Self { reader, prompt_out }
    }
}

impl<R: BufRead, W: Write> LineSource for ReaderSource<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.prompt_out, "{prompt}")?;
        self.prompt_out.flush()?;
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// What one iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The exit command was entered.
    Exit,
    /// A builtin ran inside the interpreter.
    Builtin,
    /// A foreground child ran to completion.
    Foreground(ChildStatus),
    /// A background child was started and left running.
    Background(Pid),
}

/// Interpreter state carried from one iteration to the next.
pub struct Shell {
    config: ShellConfig,
    history: HistoryStore,
    jobs: BackgroundJobs,
}

impl Shell {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            config,
            history: HistoryStore::new(),
            jobs: BackgroundJobs::new(),
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn jobs(&self) -> &BackgroundJobs {
        &self.jobs
    }

    /// Prompt, read, execute, repeat until end of input or the exit command.
    ///
    /// Errors local to one line are reported on stderr and the loop goes on.
    /// Only fatal errors (fork failure, unreadable input) end it early.
    pub fn run<S: LineSource>(&mut self, source: &mut S) -> Result<()> {
        loop {
            self.report_finished_jobs();
            let Some(raw) = source.read_line(&self.config.prompt)? else {
                debug!("end of input");
                break;
            };
            match self.execute_line(&raw) {
                Ok(Step::Exit) => break,
                Ok(step) => debug!(?step, "iteration done"),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) if err.is_silent() => {}
                Err(err) => eprintln!("osh: {err}"),
            }
        }
        self.report_finished_jobs();
        for pid in self.jobs.pids() {
            info!(%pid, "background process still running at exit");
        }
        Ok(())
    }

    /// Run one raw input line through tokenizer, resolver, planner, launcher
    /// and wait policy.
    ///
    /// The wait policy always comes from the raw line, so `!!` waits and
    /// `!! &` runs in the background whatever the replayed command was.
    pub fn execute_line(&mut self, raw: &str) -> Result<Step> {
        let line = clean_line(raw, self.config.max_line_len);
        let argv = tokenize(line, self.config.max_args);
        if argv
            .first()
            .is_some_and(|word| self.config.is_exit_command(word))
        {
            return Ok(Step::Exit);
        }

        let resolved = resolve(argv, &mut self.history)?;
        if resolved.from_history {
            println!("{}", resolved.argv.join(" "));
        }
        let policy = WaitPolicy::from_line(line);

        let mut argv = resolved.argv;
        strip_background_marker(&mut argv)?;
        if builtin::is_builtin(&argv[0]) {
            builtin::run(&argv)?;
            return Ok(Step::Builtin);
        }
        let planned = plan(argv, &self.plan_options())?;
        let child = launch(&planned)?;

        match policy {
            WaitPolicy::Wait => Ok(Step::Foreground(child.wait()?)),
            WaitPolicy::Background => {
                let pid = child.pid();
                println!("[{pid}]");
                self.jobs.track(child);
                Ok(Step::Background(pid))
            }
        }
    }

    fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            input: self.config.input_mode,
            output: self.config.output_mode,
        }
    }

    fn report_finished_jobs(&mut self) {
        for (pid, status) in self.jobs.reap() {
            println!("[{pid}] {status}");
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new(ShellConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShellError;
    use std::fs;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    #[test]
    fn reader_source_prints_prompt_per_line() {
        let mut prompt = Vec::new();
        let mut source = ReaderSource::new(Cursor::new("ls -l\n"), &mut prompt);
        assert_eq!(source.read_line("osh> ").unwrap(), Some("ls -l\n".to_string()));
        assert_eq!(source.read_line("osh> ").unwrap(), None);
        drop(source);
        assert_eq!(prompt, b"osh> osh> ");
    }

    #[test]
    fn empty_line_launches_nothing() {
        let mut shell = Shell::default();
        let err = shell.execute_line("\n").unwrap_err();
        assert!(err.is_silent());
        assert!(shell.history().is_empty());
    }

    #[test]
    fn exit_command_stops_without_touching_history() {
        let mut shell = Shell::default();
        assert_eq!(shell.execute_line("exit\n").unwrap(), Step::Exit);
        assert!(shell.history().is_empty());
    }

    #[test]
    fn foreground_command_is_waited_for() {
        let mut shell = Shell::default();
        let step = shell.execute_line("true\n").unwrap();
        assert_eq!(step, Step::Foreground(ChildStatus::Exited(0)));
    }

    #[test]
    fn history_without_entries_is_reported() {
        let mut shell = Shell::default();
        let err = shell.execute_line("!!\n").unwrap_err();
        assert!(matches!(err, ShellError::HistoryUnavailable));
    }

    #[test]
    fn bang_bang_replays_previous_command() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let mut shell = Shell::new(ShellConfig {
            output_mode: crate::config::OutputMode::Append,
            ..ShellConfig::default()
        });

        shell
            .execute_line(&format!("echo again > {}", out.display()))
            .unwrap();
        shell.execute_line("!!").unwrap();
        shell.execute_line("!!").unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "again\nagain\nagain\n");
        let expected: Vec<String> = format!("echo again > {}", out.display())
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        assert_eq!(shell.history().last(), Some(&expected[..]));
    }

    #[test]
    fn parse_error_does_not_launch() {
        let mut shell = Shell::default();
        let err = shell.execute_line("ls >").unwrap_err();
        assert!(matches!(err, ShellError::MissingRedirectTarget(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn background_command_returns_immediately() {
        let mut shell = Shell::default();
        let started = Instant::now();
        let step = shell.execute_line("sleep 1 &").unwrap();
        assert!(started.elapsed() < Duration::from_millis(900));
        let Step::Background(pid) = step else {
            panic!("expected a background step, got {step:?}");
        };
        assert_eq!(shell.jobs().pids().collect::<Vec<_>>(), vec![pid]);
    }

    #[test]
    fn bare_replay_of_background_command_waits() {
        let mut shell = Shell::default();
        shell.execute_line("sleep 0.1 &").unwrap();
        let step = shell.execute_line("!!").unwrap();
        assert_eq!(step, Step::Foreground(ChildStatus::Exited(0)));
        assert_eq!(shell.jobs().len(), 1);
    }

    #[test]
    fn replay_with_ampersand_runs_in_background() {
        let mut shell = Shell::default();
        shell.execute_line("true").unwrap();
        let step = shell.execute_line("!! &").unwrap();
        assert!(matches!(step, Step::Background(_)));
        assert_eq!(shell.history().last(), Some(&["true".to_string()][..]));
    }

    #[test]
    fn run_stops_at_end_of_input() {
        let mut shell = Shell::default();
        let mut source = ReaderSource::new(Cursor::new("true\nfalse\n"), io::sink());
        shell.run(&mut source).unwrap();
        assert_eq!(shell.history().last(), Some(&["false".to_string()][..]));
    }

    #[test]
    fn run_stops_at_exit_command() {
        let mut shell = Shell::default();
        let mut source = ReaderSource::new(Cursor::new("true\nexit\nfalse\n"), io::sink());
        shell.run(&mut source).unwrap();
        assert_eq!(shell.history().last(), Some(&["true".to_string()][..]));
    }
}
