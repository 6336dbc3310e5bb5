//! Process execution abstraction.
//!
//! The [`CommandRunner`] trait is the only way brewkit touches the outside
//! world. The real implementation lives in [`process`]; tests script a fake
//! one so planning and resolution can be exercised without Homebrew.

pub mod process;

use crate::error::Result;
use std::path::Path;
use std::time::Duration;

/// How to run one external command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Run as this uid (and `gid`) instead of the current user
    pub uid: Option<u32>,
    /// Group id to run as
    pub gid: Option<u32>,
    /// Kill the process after this long
    pub timeout: Option<Duration>,
    /// Environment variables to set
    pub env_set: Vec<(String, String)>,
    /// Environment variables to remove
    pub env_remove: Vec<String>,
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured standard output
    pub stdout: Vec<u8>,
    /// Captured standard error
    pub stderr: Vec<u8>,
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Output of a command that exited with `code`.
    pub fn with_code(code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            code: Some(code),
        }
    }

    /// Whether the command exited zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Outcome of a run: either it finished or the timeout fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited (successfully or not)
    Finished(CommandOutput),
    /// The process exceeded its timeout and was killed
    TimedOut,
}

/// Process execution capability.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and wait for it to exit or time out.
    ///
    /// Errors only when the process cannot be started or waited on; a
    /// non-zero exit is a normal [`RunOutcome::Finished`].
    fn run(&self, program: &Path, args: &[String], options: &RunOptions) -> Result<RunOutcome>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<R> {
    fn run(&self, program: &Path, args: &[String], options: &RunOptions) -> Result<RunOutcome> {
        (**self).run(program, args, options)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_output_success() {
        assert!(CommandOutput::with_code(0, "", "").success());
        assert!(!CommandOutput::with_code(1, "", "").success());
        assert!(!CommandOutput::default().success());
    }

    #[test]
    fn test_command_output_strings() {
        let out = CommandOutput::with_code(0, "hello\n", "warn");
        assert_eq!(out.stdout_str(), "hello\n");
        assert_eq!(out.stderr_str(), "warn");
    }
}
