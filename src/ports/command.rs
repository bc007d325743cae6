use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// How chatty the run is. Level 0 is quiet, 1 is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Verbosity(u8);

impl Verbosity {
    pub const QUIET: Verbosity = Verbosity(0);
    pub const NORMAL: Verbosity = Verbosity(1);

    /// Build from `-v`/`-q` counts. Any `-q` wins over every `-v`.
    pub fn from_flags(verbose: u8, quiet: u8) -> Self {
        if quiet > 0 {
            Self::QUIET
        } else {
            Verbosity(verbose.saturating_add(1))
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn is_quiet(self) -> bool {
        self.0 == 0
    }

    pub fn console_log_level(self) -> log::LevelFilter {
        match self.0 {
            0 => log::LevelFilter::Error,
            1 | 2 => log::LevelFilter::Info,
            3 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// A single external process launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
    /// Minimum verbosity at which the tool's output reaches the terminal.
    /// `None` means output is always captured.
    pub show_output_at: Option<u8>,
}

impl CommandInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            show_output_at: Some(3),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    pub fn show_output_at(mut self, level: u8) -> Self {
        self.show_output_at = Some(level);
        self
    }

    pub fn capture_output(mut self) -> Self {
        self.show_output_at = None;
        self
    }

    /// Whether the tool should write straight to the terminal.
    pub fn is_shown(&self, verbosity: Verbosity) -> bool {
        match self.show_output_at {
            Some(level) => !verbosity.is_quiet() && verbosity.level() >= level,
            None => false,
        }
    }

    /// Argument at `index`, if it is valid UTF-8.
    #[cfg(test)]
    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(|a| a.to_str())
    }
}

/// What came back from a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Captured stdout. Empty when output went to the terminal.
    pub stdout: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    #[cfg(test)]
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
        }
    }

    #[cfg(test)]
    pub fn with_stdout(code: i32, stdout: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: stdout.into(),
        }
    }
}

/// Human readable exit status for error messages.
pub fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("`{program}` not found in PATH")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("failed to launch `{program}`")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Port wrapping every external process the library tools launch.
///
/// The production implementation lives in `services::command`; tests use
/// the generated mock or the fake toolchain in `test_utils`.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput, CommandError>;
}
