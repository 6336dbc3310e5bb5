//! # brewkit
//!
//! Idempotent Homebrew formula reconciliation.
//!
//! Given a desired list of formulae, each optionally pinned to an exact
//! version, brewkit works out which `brew` invocations bring the machine to
//! that state and runs them as the Homebrew owner:
//! - Querying `brew info --json` for installed versions
//! - Resolving pins to versioned formulae (`name@version`), extracting them on demand
//! - Planning upgrade, install, remove and purge batches
//! - Running brew as the non-root owner with a timeout and a scrubbed environment
//!
//! ## Example
//!
//! ```no_run
//! use brewkit::{Client, HostOptions, PackageSpec};
//!
//! let client = Client::detect(&HostOptions::default()).expect("Homebrew not available");
//!
//! let specs = vec![PackageSpec::new("git"), PackageSpec::pinned("node", "20.11.1")];
//! let plan = client.plan_upgrade(&specs);
//! for batch in plan.batches() {
//!     println!("{batch}");
//! }
//!
//! client.upgrade(&specs).expect("Upgrade failed");
//! ```
//!
//! Running the same pass twice is a no-op the second time: specs already at
//! their pin (or at the latest stable version) are reported as satisfied.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod executor;
pub mod host;
pub mod info;
pub mod planner;
pub mod resolver;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use executor::PrivilegedExecutor;
pub use host::{Arch, HostEnvironment, HostOptions, Owner};
pub use info::PackageInfoClient;
pub use planner::ReconciliationPlanner;
pub use resolver::VersionResolver;
pub use types::{
    Action, ExecOptions, OperationBatch, PackageInfo, PackageSpec, ResolvedFormula, UpgradePlan,
};

use backend::CommandRunner;
use backend::process::ProcessRunner;
use std::time::Duration;

/// High-level client for reconciliation passes.
///
/// Owns the host description and the process runner, and builds the
/// executor, resolver and planner for each call so every pass sees fresh
/// `brew info` data.
pub struct Client {
    host: HostEnvironment,
    runner: Box<dyn CommandRunner>,
    timeout: Duration,
    tap: String,
    options: ExecOptions,
    dry_run: bool,
}

impl Client {
    /// Detect the host and make sure brew is usable.
    ///
    /// Returns an error if Homebrew is not installed or its owner is not allowed.
    pub fn detect(options: &HostOptions) -> Result<Self> {
        let host = HostEnvironment::detect(options)?;
        host.ensure_brew()?;
        Ok(Self::new(host))
    }

    /// Create a client for a known host using real processes.
    pub fn new(host: HostEnvironment) -> Self {
        Self::with_runner(host, Box::new(ProcessRunner::new()))
    }

    /// Create a client with a custom runner (useful for testing).
    pub fn with_runner(host: HostEnvironment, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            host,
            runner,
            timeout: executor::DEFAULT_TIMEOUT,
            tap: resolver::DEFAULT_EXTRACT_TAP.to_string(),
            options: ExecOptions::default(),
            dry_run: false,
        }
    }

    /// Override the per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extract versioned formulae into `tap`.
    pub fn with_tap(mut self, tap: impl Into<String>) -> Self {
        self.tap = tap.into();
        self
    }

    /// Extra flags passed to every install, upgrade and uninstall.
    pub fn with_brew_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options = self.options.with_args(args);
        self
    }

    /// Plan without extracting or executing anything.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The host this client manages.
    pub fn host(&self) -> &HostEnvironment {
        &self.host
    }

    /// Full brew argument list for a batch, configured flags included.
    pub fn brew_args(&self, batch: &OperationBatch) -> Vec<String> {
        batch.args(&self.options.extra_args)
    }

    /// Whether batches are only planned.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn executor(&self) -> PrivilegedExecutor<'_> {
        PrivilegedExecutor::new(&self.host, self.runner.as_ref()).with_timeout(self.timeout)
    }

    fn with_planner<T>(&self, f: impl FnOnce(&ReconciliationPlanner<'_>) -> T) -> T {
        let executor = self.executor();
        let resolver = VersionResolver::new(&executor)
            .with_tap(self.tap.clone())
            .dry_run(self.dry_run);
        let planner = ReconciliationPlanner::new(&resolver);
        f(&planner)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Fresh `brew info` data for one formula.
    pub fn info(&self, formula: &str) -> PackageInfo {
        let executor = self.executor();
        PackageInfoClient::new(&executor).query(formula)
    }

    // =========================================================================
    // Planning
    // =========================================================================

    /// Split specs into upgrades, installs and satisfied names.
    pub fn plan_upgrade(&self, specs: &[PackageSpec]) -> UpgradePlan {
        self.with_planner(|p| p.plan_upgrade(specs))
    }

    /// Batches a pass of `action` would run, in execution order.
    pub fn plan(&self, action: Action, specs: &[PackageSpec]) -> Vec<OperationBatch> {
        self.with_planner(|p| match action {
            Action::Install => {
                let formulae = p.plan_install(specs);
                if formulae.is_empty() {
                    Vec::new()
                } else {
                    vec![OperationBatch::Install(formulae)]
                }
            }
            Action::Upgrade => p.plan_upgrade(specs).batches(),
            Action::Remove => p.plan_remove(specs).into_iter().collect(),
            Action::Purge => p.plan_purge(specs).into_iter().collect(),
        })
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Plan and run a pass, returning the batches that ran (or would run).
    ///
    /// Batches run one at a time; the first failure stops the pass.
    pub fn reconcile(&self, action: Action, specs: &[PackageSpec]) -> Result<Vec<OperationBatch>> {
        let batches = self.plan(action, specs);
        if batches.is_empty() {
            log::info!("Nothing to {action}");
            return Ok(batches);
        }
        self.apply(&batches)?;
        Ok(batches)
    }

    /// Run already planned batches in order.
    pub fn apply(&self, batches: &[OperationBatch]) -> Result<()> {
        if self.dry_run {
            for batch in batches {
                log::info!("Would run brew {}", self.brew_args(batch).join(" "));
            }
            return Ok(());
        }

        let executor = self.executor();
        for batch in batches.iter().filter(|b| !b.is_empty()) {
            executor.execute(batch, &self.options)?;
        }
        Ok(())
    }

    /// Install every spec that resolves.
    pub fn install(&self, specs: &[PackageSpec]) -> Result<Vec<OperationBatch>> {
        self.reconcile(Action::Install, specs)
    }

    /// Upgrade unpinned specs and install pinned or missing ones.
    pub fn upgrade(&self, specs: &[PackageSpec]) -> Result<Vec<OperationBatch>> {
        self.reconcile(Action::Upgrade, specs)
    }

    /// Uninstall every spec that resolves.
    pub fn remove(&self, specs: &[PackageSpec]) -> Result<Vec<OperationBatch>> {
        self.reconcile(Action::Remove, specs)
    }

    /// Force-uninstall every spec that resolves.
    pub fn purge(&self, specs: &[PackageSpec]) -> Result<Vec<OperationBatch>> {
        self.reconcile(Action::Purge, specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockRunner;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn client(runner: &Arc<MockRunner>) -> Client {
        let owner = Owner {
            name: "alice".to_string(),
            uid: 501,
            gid: 20,
            home: PathBuf::from("/Users/alice"),
        };
        let host = HostEnvironment::new(owner, Arch::AppleSilicon, "/opt/homebrew");
        Client::with_runner(host, Box::new(Arc::clone(runner)))
    }

    #[test]
    fn test_upgrade_runs_upgrades_before_installs() {
        let runner = Arc::new(
            MockRunner::new()
                .info("git", r#"{"linked_keg": "2.40.0", "versions": {"stable": "2.43.0"}}"#)
                .ok("upgrade git", "")
                .ok("install bar", ""),
        );
        let client = client(&runner);

        let specs = vec![PackageSpec::new("bar"), PackageSpec::new("git")];
        let batches = client.upgrade(&specs).unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(runner.mutations(), vec!["upgrade git", "install bar"]);
    }

    #[test]
    fn test_upgrade_failure_stops_pass() {
        let runner = Arc::new(
            MockRunner::new()
                .info("git", r#"{"linked_keg": "2.40.0"}"#)
                .fail("upgrade git", 1, "Error: Failed to download resource")
                .ok("install bar", ""),
        );
        let client = client(&runner);

        let specs = vec![PackageSpec::new("bar"), PackageSpec::new("git")];
        let err = client.upgrade(&specs).unwrap_err();

        assert_eq!(err.category(), Some(ErrorCategory::Network));
        assert_eq!(runner.mutations(), vec!["upgrade git"]);
    }

    #[test]
    fn test_remove_with_nothing_resolved_runs_nothing() {
        let runner = Arc::new(MockRunner::new().info("foo", r#"{"linked_keg": "2.0"}"#));
        let client = client(&runner);

        let batches = client.remove(&[PackageSpec::pinned("foo", "1.0")]).unwrap();
        assert!(batches.is_empty());
        assert!(!runner.calls().iter().any(|c| c.starts_with("uninstall")));
    }

    #[test]
    fn test_purge_passes_force() {
        let runner = Arc::new(MockRunner::new().ok("uninstall --force git", ""));
        let client = client(&runner);

        client.purge(&[PackageSpec::new("git")]).unwrap();
        assert_eq!(runner.mutations(), vec!["uninstall --force git"]);
    }

    #[test]
    fn test_brew_args_apply_to_batches() {
        let runner = Arc::new(MockRunner::new().ok("install --force-bottle git", ""));
        let client = client(&runner).with_brew_args(["--force-bottle"]);

        client.install(&[PackageSpec::new("git")]).unwrap();
        assert_eq!(runner.mutations(), vec!["install --force-bottle git"]);
    }

    #[test]
    fn test_brew_args_include_configured_flags() {
        let runner = Arc::new(MockRunner::new());
        let client = client(&runner).with_brew_args(["--force-bottle"]);

        let batch = OperationBatch::Purge(vec!["git".into()]);
        assert_eq!(
            client.brew_args(&batch),
            vec!["uninstall", "--force", "--force-bottle", "git"]
        );
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let runner = Arc::new(
            MockRunner::new()
                .info("git", r#"{"linked_keg": "2.40.0"}"#)
                .info("foo", r#"{"linked_keg": "2.0"}"#),
        );
        let client = client(&runner).with_dry_run(true);

        let specs = vec![PackageSpec::new("git"), PackageSpec::pinned("foo", "1.0")];
        let batches = client.upgrade(&specs).unwrap();

        assert_eq!(
            batches,
            vec![
                OperationBatch::Upgrade(vec!["git".into()]),
                OperationBatch::Install(vec!["foo@1.0".into()]),
            ]
        );
        assert!(runner.mutations().is_empty());
    }

    #[test]
    fn test_custom_tap_reaches_extract() {
        let runner = Arc::new(
            MockRunner::new()
                .ok("extract --force --version=1.0 foo acme/tools", "")
                .ok("install foo@1.0", ""),
        );
        let client = client(&runner).with_tap("acme/tools");

        client.install(&[PackageSpec::pinned("foo", "1.0")]).unwrap();
        assert_eq!(
            runner.mutations(),
            vec!["extract --force --version=1.0 foo acme/tools", "install foo@1.0"]
        );
    }
}
