//! Runs brew as the Homebrew owner.
//!
//! Every brew invocation in the crate goes through [`PrivilegedExecutor`],
//! including read-only `info` queries: brew refuses to run as root, and
//! the orchestrator usually is root.

use crate::backend::{CommandOutput, CommandRunner, RunOptions, RunOutcome};
use crate::error::{Error, ErrorCategory, Result};
use crate::host::HostEnvironment;
use crate::types::{ExecOptions, OperationBatch};
use std::time::Duration;

/// Ceiling for a single brew invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1800);

/// Ambient interpreter and build-tool variables that leak into brew's Ruby.
pub const SCRUBBED_ENV: &[&str] = &[
    "RUBYOPT",
    "RUBYLIB",
    "GEM_HOME",
    "GEM_PATH",
    "BUNDLE_GEMFILE",
    "TMPDIR",
];

/// Executes brew commands as the non-privileged owner.
pub struct PrivilegedExecutor<'a> {
    host: &'a HostEnvironment,
    runner: &'a dyn CommandRunner,
    timeout: Duration,
}

impl<'a> PrivilegedExecutor<'a> {
    /// Create an executor with the default timeout.
    pub fn new(host: &'a HostEnvironment, runner: &'a dyn CommandRunner) -> Self {
        Self {
            host,
            runner,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The host this executor targets.
    pub fn host(&self) -> &HostEnvironment {
        self.host
    }

    /// Run one operation batch.
    ///
    /// Fails with [`Error::Execution`] on a non-zero exit unless
    /// `options.allow_failure` is set, and with [`Error::Timeout`] when the
    /// ceiling is hit. The whole batch fails together.
    pub fn execute(&self, batch: &OperationBatch, options: &ExecOptions) -> Result<CommandOutput> {
        log::info!("Running brew {}: {}", batch.verb(), batch.formulae().join(" "));
        let args = batch.args(&options.extra_args);
        self.run_as_owner(batch.verb(), &args, batch.formulae(), options.allow_failure)
    }

    /// Run arbitrary brew arguments as the owner.
    pub fn run(&self, args: &[String], allow_failure: bool) -> Result<CommandOutput> {
        let verb = args.first().map_or("", String::as_str);
        let subjects: Vec<String> = args
            .iter()
            .skip(1)
            .filter(|a| !a.starts_with('-'))
            .cloned()
            .collect();
        self.run_as_owner(verb, args, &subjects, allow_failure)
    }

    fn run_as_owner(
        &self,
        verb: &str,
        args: &[String],
        formulae: &[String],
        allow_failure: bool,
    ) -> Result<CommandOutput> {
        let owner = self.host.owner();
        if owner.is_root() {
            return Err(Error::PrivilegedOwner {
                name: owner.name.clone(),
            });
        }

        let bin = self.host.bin();
        log::debug!(
            "Executing '{} {}' as user '{}'",
            bin.display(),
            args.join(" "),
            owner.name
        );

        let outcome = self.runner.run(&bin, args, &self.run_options())?;
        let output = match outcome {
            RunOutcome::Finished(output) => output,
            RunOutcome::TimedOut => {
                return Err(Error::Timeout {
                    verb: verb.to_string(),
                    formulae: formulae.to_vec(),
                    timeout: self.timeout,
                });
            }
        };

        if !output.success() && !allow_failure {
            let stderr = output.stderr_str().trim().to_string();
            return Err(Error::Execution {
                verb: verb.to_string(),
                formulae: formulae.to_vec(),
                code: output.code,
                category: ErrorCategory::from_stderr(&stderr),
                stderr,
            });
        }

        Ok(output)
    }

    fn run_options(&self) -> RunOptions {
        let owner = self.host.owner();
        RunOptions {
            uid: Some(owner.uid),
            gid: Some(owner.gid),
            timeout: Some(self.timeout),
            env_set: vec![
                ("HOME".to_string(), owner.home.display().to_string()),
                ("USER".to_string(), owner.name.clone()),
            ],
            env_remove: SCRUBBED_ENV.iter().map(|s| s.to_string()).collect(),
        }
    }
}
