//! `brew info --json` queries.
//!
//! Queries are advisory. Any failure along the way (spawn error, non-zero
//! exit, timeout, unexpected JSON) yields [`PackageInfo::default`], which
//! callers read as "unknown / not installed".

use crate::executor::PrivilegedExecutor;
use crate::types::{InstalledVersion, PackageInfo};
use serde::Deserialize;

#[derive(Deserialize)]
struct RawInfo {
    #[serde(default)]
    linked_keg: Option<String>,
    #[serde(default)]
    keg_only: bool,
    #[serde(default)]
    installed: Vec<InstalledVersion>,
    #[serde(default)]
    versions: Option<RawVersions>,
}

#[derive(Deserialize)]
struct RawVersions {
    #[serde(default)]
    stable: Option<String>,
}

impl From<RawInfo> for PackageInfo {
    fn from(raw: RawInfo) -> Self {
        Self {
            linked_keg: raw.linked_keg,
            keg_only: raw.keg_only,
            installed: raw.installed,
            stable_version: raw.versions.and_then(|v| v.stable),
        }
    }
}

/// Parse `brew info --json` output, using only the first array element.
///
/// Anything structurally unexpected maps to the neutral value.
pub fn parse_info(json: &str) -> PackageInfo {
    match serde_json::from_str::<Vec<RawInfo>>(json) {
        Ok(entries) => entries.into_iter().next().map(PackageInfo::from).unwrap_or_default(),
        Err(e) => {
            log::debug!("Unparsable brew info output: {e}");
            PackageInfo::default()
        }
    }
}

/// Fetches fresh [`PackageInfo`] for one formula per call.
pub struct PackageInfoClient<'a> {
    executor: &'a PrivilegedExecutor<'a>,
}

impl<'a> PackageInfoClient<'a> {
    /// Create a client on top of an executor.
    pub fn new(executor: &'a PrivilegedExecutor<'a>) -> Self {
        Self { executor }
    }

    /// Query brew for one formula. Never fails.
    pub fn query(&self, formula: &str) -> PackageInfo {
        let args = ["info".to_string(), formula.to_string(), "--json".to_string()];
        match self.executor.run(&args, true) {
            Ok(output) if output.success() => parse_info(&output.stdout_str()),
            Ok(output) => {
                log::debug!(
                    "brew info {formula} exited {:?}: {}",
                    output.code,
                    output.stderr_str().trim()
                );
                PackageInfo::default()
            }
            Err(e) => {
                log::debug!("brew info {formula} failed: {e}");
                PackageInfo::default()
            }
        }
    }

    /// Installed version of a formula, if any.
    pub fn installed_version(&self, formula: &str) -> Option<String> {
        self.query(formula).installed_version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RunOutcome;
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
    fn test_parse_linked() {
        let info = parse_info(
            r#"[{"name": "git", "linked_keg": "2.43.0_1", "keg_only": false,
                 "installed": [{"version": "2.43.0_1", "installed_on_request": true}],
                 "versions": {"stable": "2.43.0", "head": "HEAD", "bottle": true}}]"#,
        );
        assert_eq!(info.linked_keg.as_deref(), Some("2.43.0_1"));
        assert_eq!(info.stable_version.as_deref(), Some("2.43.0"));
        assert_eq!(info.installed_version(), Some("2.43.0".to_string()));
    }

    #[test]
    fn test_parse_keg_only() {
        let info = parse_info(
            r#"[{"linked_keg": null, "keg_only": true,
                 "installed": [{"version": "1.2"}, {"version": "1.3"}]}]"#,
        );
        assert_eq!(info.installed_version(), Some("1.3".to_string()));
    }

    #[test]
    fn test_parse_uses_first_element_only() {
        let info = parse_info(r#"[{"linked_keg": "1.0"}, {"linked_keg": "9.9"}]"#);
        assert_eq!(info.installed_version(), Some("1.0".to_string()));
    }

    #[test]
    fn test_parse_neutral_on_garbage() {
        assert_eq!(parse_info(""), PackageInfo::default());
        assert_eq!(parse_info("[]"), PackageInfo::default());
        assert_eq!(parse_info("{\"formulae\": []}"), PackageInfo::default());
        assert_eq!(parse_info(r#"[{"keg_only": "yes"}]"#), PackageInfo::default());
        assert_eq!(parse_info("Error: No available formula"), PackageInfo::default());
    }

    #[test]
    fn test_query_not_installed_is_neutral() {
        let host = host();
        let runner = MockRunner::new().fail(
            "info nope --json",
            1,
            "Error: No available formula with the name \"nope\".",
        );
        let exec = PrivilegedExecutor::new(&host, &runner);
        let client = PackageInfoClient::new(&exec);

        assert_eq!(client.query("nope"), PackageInfo::default());
        assert_eq!(client.installed_version("nope"), None);
    }

    #[test]
    fn test_query_timeout_is_neutral() {
        let host = host();
        let runner = MockRunner::new().respond("info git --json", RunOutcome::TimedOut);
        let exec = PrivilegedExecutor::new(&host, &runner);
        let client = PackageInfoClient::new(&exec);

        assert_eq!(client.query("git"), PackageInfo::default());
    }

    #[test]
    fn test_query_is_not_cached() {
        let host = host();
        let runner = MockRunner::new().info("git", r#"{"linked_keg": "2.0"}"#);
        let exec = PrivilegedExecutor::new(&host, &runner);
        let client = PackageInfoClient::new(&exec);

        assert_eq!(client.installed_version("git"), Some("2.0".to_string()));
        runner.set(
            "info git --json",
            RunOutcome::Finished(crate::backend::CommandOutput::with_code(
                0,
                r#"[{"linked_keg": "2.1"}]"#,
                "",
            )),
        );
        assert_eq!(client.installed_version("git"), Some("2.1".to_string()));
        assert_eq!(runner.calls().len(), 2);
    }
}
