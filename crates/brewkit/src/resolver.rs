//! Maps a desired (name, version) pair to the formula name brew should see.
//!
//! Homebrew cannot install an arbitrary historical version of a formula by
//! itself. A pin that the plain formula does not satisfy is served by a
//! versioned formula `name@version`, which either already exists (installed
//! or shipped as a custom formula) or is materialized with `brew extract`.
//! When neither works the package is dropped rather than failing the batch.

use crate::executor::PrivilegedExecutor;
use crate::info::PackageInfoClient;
use crate::types::{PackageSpec, ResolvedFormula, versioned_formula};

/// Tap that receives extracted formulae unless configured otherwise.
pub const DEFAULT_EXTRACT_TAP: &str = "homebrew/cask";

/// Resolves specs to effective formula names.
pub struct VersionResolver<'a> {
    executor: &'a PrivilegedExecutor<'a>,
    info: PackageInfoClient<'a>,
    tap: String,
    dry_run: bool,
}

impl<'a> VersionResolver<'a> {
    /// Create a resolver extracting into [`DEFAULT_EXTRACT_TAP`].
    pub fn new(executor: &'a PrivilegedExecutor<'a>) -> Self {
        Self {
            executor,
            info: PackageInfoClient::new(executor),
            tap: DEFAULT_EXTRACT_TAP.to_string(),
            dry_run: false,
        }
    }

    /// Extract versioned formulae into a different tap.
    pub fn with_tap(mut self, tap: impl Into<String>) -> Self {
        self.tap = tap.into();
        self
    }

    /// Assume extraction would succeed instead of running it.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The info client used for queries.
    pub fn info(&self) -> &PackageInfoClient<'a> {
        &self.info
    }

    /// Resolve one spec, or `None` if its pin cannot be satisfied.
    pub fn resolve(&self, spec: &PackageSpec) -> Option<ResolvedFormula> {
        if !spec.has_name() {
            return None;
        }

        let resolved = |effective: String| ResolvedFormula {
            requested_name: spec.name.clone(),
            requested_version: spec.pinned_version.clone(),
            effective_formula_name: effective,
        };

        let Some(version) = spec.pinned_version.as_deref() else {
            return Some(resolved(spec.name.clone()));
        };

        if self.info.installed_version(&spec.name).as_deref() == Some(version) {
            return Some(resolved(spec.name.clone()));
        }

        let versioned = versioned_formula(&spec.name, version);
        if self.info.query(&versioned).is_known() {
            log::debug!("Using existing versioned formula {versioned}");
            return Some(resolved(versioned));
        }

        if self.extract(&spec.name, version) {
            log::info!("Extracted {versioned} into {}", self.tap);
            return Some(resolved(versioned));
        }

        log::warn!(
            "Cannot satisfy {} at version {}; skipping it",
            spec.name,
            version
        );
        None
    }

    /// Resolve every spec, keeping only effective names, in input order.
    pub fn formulae_for(&self, specs: &[PackageSpec]) -> Vec<String> {
        specs
            .iter()
            .filter_map(|s| self.resolve(s))
            .map(|r| r.effective_formula_name)
            .collect()
    }

    /// Best-effort `brew extract`; failures are ignored.
    fn extract(&self, name: &str, version: &str) -> bool {
        if self.dry_run {
            log::info!("Would extract {name}@{version} into {}", self.tap);
            return true;
        }
        let args = [
            "extract".to_string(),
            "--force".to_string(),
            format!("--version={version}"),
            name.to_string(),
            self.tap.clone(),
        ];
        match self.executor.run(&args, true) {
            Ok(output) => output.success(),
            Err(e) => {
                log::debug!("brew extract {name}@{version} failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockRunner;
    use crate::host::{Arch, HostEnvironment, Owner};
    use std::path::PathBuf;

    fn host() -> HostEnvironment {
        let owner = Owner {
            name: "alice".to_string(),
            uid: 501,
            gid: 20,
            home: PathBuf::from("/Users/alice"),
        };
        HostEnvironment::new(owner, Arch::AppleSilicon, "/opt/homebrew")
    }

    #[test]
    fn test_unpinned_resolves_plain_without_queries() {
        let host = host();
        let runner = MockRunner::new();
        let exec = PrivilegedExecutor::new(&host, &runner);
        let resolver = VersionResolver::new(&exec);

        let r = resolver.resolve(&PackageSpec::new("git")).unwrap();
        assert_eq!(r.effective_formula_name, "git");
        assert!(!r.is_versioned());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_pin_matching_installed_resolves_plain() {
        let host = host();
        let runner = MockRunner::new().info("foo", r#"{"linked_keg": "1.0_2"}"#);
        let exec = PrivilegedExecutor::new(&host, &runner);
        let resolver = VersionResolver::new(&exec);

        let r = resolver.resolve(&PackageSpec::pinned("foo", "1.0")).unwrap();
        assert_eq!(r.effective_formula_name, "foo");
        assert!(runner.mutations().is_empty());
    }

    #[test]
    fn test_existing_versioned_formula() {
        let host = host();
        let runner = MockRunner::new()
            .info("foo", r#"{"linked_keg": "2.0"}"#)
            .info("foo@1.0", r#"{"keg_only": true, "installed": [{"version": "1.0"}]}"#);
        let exec = PrivilegedExecutor::new(&host, &runner);
        let resolver = VersionResolver::new(&exec);

        let r = resolver.resolve(&PackageSpec::pinned("foo", "1.0")).unwrap();
        assert_eq!(r.effective_formula_name, "foo@1.0");
        assert_eq!(r.requested_version.as_deref(), Some("1.0"));
        assert!(runner.mutations().is_empty());
    }

    #[test]
    fn test_available_versioned_formula_is_not_extracted() {
        let host = host();
        let runner = MockRunner::new()
            .info("devspace", r#"{"linked_keg": "6.0.0"}"#)
            .info(
                "devspace@5.17.0-beta.6",
                r#"{"name": "devspace@5.17.0-beta.6", "linked_keg": null, "installed": [],
                    "versions": {"stable": "5.17.0-beta.6"}}"#,
            )
            .fail(
                "extract --force --version=5.17.0-beta.6 devspace homebrew/cask",
                1,
                "Error: No available versions",
            );
        let exec = PrivilegedExecutor::new(&host, &runner);
        let resolver = VersionResolver::new(&exec);

        let r = resolver
            .resolve(&PackageSpec::pinned("devspace", "5.17.0-beta.6"))
            .unwrap();
        assert_eq!(r.effective_formula_name, "devspace@5.17.0-beta.6");
        assert!(runner.mutations().is_empty());
    }

    #[test]
    fn test_extracts_missing_versioned_formula() {
        let host = host();
        let runner = MockRunner::new()
            .info("foo", r#"{"linked_keg": "2.0"}"#)
            .ok("extract --force --version=1.0 foo homebrew/cask", "");
        let exec = PrivilegedExecutor::new(&host, &runner);
        let resolver = VersionResolver::new(&exec);

        let r = resolver.resolve(&PackageSpec::pinned("foo", "1.0")).unwrap();
        assert_eq!(r.effective_formula_name, "foo@1.0");
        assert_eq!(
            runner.mutations(),
            vec!["extract --force --version=1.0 foo homebrew/cask"]
        );
    }

    #[test]
    fn test_extract_uses_configured_tap() {
        let host = host();
        let runner = MockRunner::new().ok("extract --force --version=1.0 foo acme/tools", "");
        let exec = PrivilegedExecutor::new(&host, &runner);
        let resolver = VersionResolver::new(&exec).with_tap("acme/tools");

        let r = resolver.resolve(&PackageSpec::pinned("foo", "1.0")).unwrap();
        assert_eq!(r.effective_formula_name, "foo@1.0");
    }

    #[test]
    fn test_dry_run_skips_extract() {
        let host = host();
        let runner = MockRunner::new().info("foo", r#"{"linked_keg": "2.0"}"#);
        let exec = PrivilegedExecutor::new(&host, &runner);
        let resolver = VersionResolver::new(&exec).dry_run(true);

        let r = resolver.resolve(&PackageSpec::pinned("foo", "1.0")).unwrap();
        assert_eq!(r.effective_formula_name, "foo@1.0");
        assert!(runner.mutations().is_empty());
    }

    #[test]
    fn test_unsatisfiable_pin_is_dropped() {
        let host = host();
        let runner = MockRunner::new()
            .info("foo", r#"{"linked_keg": "2.0"}"#)
            .fail(
                "extract --force --version=1.0 foo homebrew/cask",
                1,
                "Error: No available versions for foo",
            );
        let exec = PrivilegedExecutor::new(&host, &runner);
        let resolver = VersionResolver::new(&exec);

        assert_eq!(resolver.resolve(&PackageSpec::pinned("foo", "1.0")), None);
    }

    #[test]
    fn test_empty_name_is_dropped() {
        let host = host();
        let runner = MockRunner::new();
        let exec = PrivilegedExecutor::new(&host, &runner);
        let resolver = VersionResolver::new(&exec);

        assert_eq!(resolver.resolve(&PackageSpec::pinned("", "1.0")), None);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_formulae_for_keeps_order_and_filters() {
        let host = host();
        let runner = MockRunner::new().info("foo", r#"{"linked_keg": "2.0"}"#);
        let exec = PrivilegedExecutor::new(&host, &runner);
        let resolver = VersionResolver::new(&exec);

        let specs = vec![
            PackageSpec::new("git"),
            PackageSpec::new(""),
            PackageSpec::pinned("foo", "1.0"),
            PackageSpec::new("jq"),
        ];
        assert_eq!(resolver.formulae_for(&specs), vec!["git", "jq"]);
    }
}
