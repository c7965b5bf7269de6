//! The process boundary.
//!
//! Every device operation ends in an external process. [`CommandRunner`] is
//! the seam between the facade and the host: [`SystemRunner`] spawns real
//! processes through `std::process::Command`, and tests substitute a scripted
//! runner that replays canned output.

use std::fmt;
use std::io::ErrorKind;
use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// A fully-resolved external command: program plus all arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        let status = match self.code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        };
        if stderr.is_empty() {
            status
        } else {
            format!("{}: {}", status, stderr)
        }
    }
}

/// Errors from spawning or running an external process.
#[derive(Error, Debug)]
pub enum RunError {
    /// The program is not installed (or not on `PATH`).
    #[error("{program} not found")]
    NotFound { program: String },

    /// The process could not be spawned for another reason.
    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("command '{invocation}' failed with {message}")]
    Failed { invocation: String, message: String },
}

impl RunError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RunError::NotFound { .. })
    }
}

/// Runs external commands on behalf of the device facade.
pub trait CommandRunner {
    /// Spawns the command and waits for it, capturing stdout and stderr.
    ///
    /// Only spawn failures are errors here; a non-zero exit is reported
    /// through [`CommandOutput::code`].
    fn output(&self, invocation: &Invocation) -> Result<CommandOutput, RunError>;

    /// Runs the command and returns its stdout, treating a non-zero exit as
    /// [`RunError::Failed`].
    fn run(&self, invocation: &Invocation) -> Result<String, RunError> {
        let output = self.output(invocation)?;
        if output.is_success() {
            Ok(output.stdout)
        } else {
            Err(RunError::Failed {
                invocation: invocation.to_string(),
                message: output.failure_message(),
            })
        }
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn output(&self, invocation: &Invocation) -> Result<CommandOutput, RunError> {
        (**self).output(invocation)
    }
}

/// [`CommandRunner`] backed by real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn output(&self, invocation: &Invocation) -> Result<CommandOutput, RunError> {
        debug!(program = %invocation.program, args = ?invocation.args, "spawning");

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RunError::NotFound {
                    program: invocation.program.clone(),
                },
                _ => RunError::Io {
                    program: invocation.program.clone(),
                    source: e,
                },
            })?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        debug!(program = %invocation.program, code = ?result.code, "finished");
        Ok(result)
    }
}
