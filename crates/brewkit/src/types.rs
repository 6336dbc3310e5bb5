//! Core types for formula reconciliation.

use serde::{Deserialize, Serialize};

/// A desired formula: a name and an optional exact version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageSpec {
    /// Logical formula name (e.g., "git", "devspace")
    pub name: String,
    /// Exact version to hold, or `None` for latest
    #[serde(default, rename = "version", skip_serializing_if = "Option::is_none")]
    pub pinned_version: Option<String>,
}

impl PackageSpec {
    /// Create an unpinned spec.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pinned_version: None,
        }
    }

    /// Create a spec pinned to an exact version.
    pub fn pinned(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pinned_version: Some(version.into()),
        }
    }

    /// Whether the spec names anything at all.
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// The synthesized versioned formula name (`name@version`), if pinned.
    pub fn versioned_name(&self) -> Option<String> {
        self.pinned_version
            .as_deref()
            .map(|v| versioned_formula(&self.name, v))
    }
}

impl std::fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.pinned_version {
            Some(v) => write!(f, "{} ({})", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Build a versioned formula name.
pub fn versioned_formula(name: &str, version: &str) -> String {
    format!("{name}@{version}")
}

/// One entry of `installed` in `brew info --json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledVersion {
    /// Installed keg version (may carry a `_N` revision)
    pub version: String,
}

impl InstalledVersion {
    /// Create an entry for a version string.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

/// What Homebrew currently knows about one formula.
///
/// The default value means "unknown / not installed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Version of the keg linked into the prefix
    pub linked_keg: Option<String>,
    /// Whether the formula is never linked into the prefix
    pub keg_only: bool,
    /// Installed kegs, oldest first
    pub installed: Vec<InstalledVersion>,
    /// Latest stable version offered by the formula
    pub stable_version: Option<String>,
}

impl PackageInfo {
    /// Currently installed version, following the three linkage states.
    ///
    /// Linked kegs report their linked version minus any `_N` revision.
    /// Keg-only formulae are never linked, so the newest installed keg is
    /// used. Anything else (unlinked or absent) has no installed version.
    pub fn installed_version(&self) -> Option<String> {
        if let Some(linked) = &self.linked_keg {
            return linked.split('_').next().map(str::to_string);
        }
        if self.keg_only {
            return self.installed.last().map(|i| i.version.clone());
        }
        None
    }

    /// Whether any keg of this formula is present.
    pub fn has_installed(&self) -> bool {
        !self.installed.is_empty()
    }

    /// Whether brew knows the formula at all, installed or not.
    pub fn is_known(&self) -> bool {
        *self != Self::default()
    }
}

/// The formula name actually passed to brew for a spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFormula {
    /// Name from the spec
    pub requested_name: String,
    /// Pinned version from the spec
    pub requested_version: Option<String>,
    /// Plain or versioned formula name handed to brew
    pub effective_formula_name: String,
}

impl ResolvedFormula {
    /// Whether resolution switched to a synthesized `name@version` formula.
    pub fn is_versioned(&self) -> bool {
        self.effective_formula_name != self.requested_name
    }
}

/// A single brew invocation covering one verb and one or more formulae.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationBatch {
    /// `brew install <formulae>`
    Install(Vec<String>),
    /// `brew upgrade <formulae>`
    Upgrade(Vec<String>),
    /// `brew uninstall <formulae>`
    Remove(Vec<String>),
    /// `brew uninstall --force <formulae>`
    Purge(Vec<String>),
}

impl OperationBatch {
    /// The brew subcommand for this batch.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Upgrade(_) => "upgrade",
            Self::Remove(_) | Self::Purge(_) => "uninstall",
        }
    }

    /// Formula names in this batch.
    pub fn formulae(&self) -> &[String] {
        match self {
            Self::Install(f) | Self::Upgrade(f) | Self::Remove(f) | Self::Purge(f) => f,
        }
    }

    /// Whether the batch has nothing to do.
    pub fn is_empty(&self) -> bool {
        self.formulae().is_empty()
    }

    /// Full brew argument list: verb, fixed flags, extra options, formulae.
    pub fn args(&self, extra: &[String]) -> Vec<String> {
        let mut args = vec![self.verb().to_string()];
        if matches!(self, Self::Purge(_)) {
            args.push("--force".to_string());
        }
        args.extend(extra.iter().cloned());
        args.extend(self.formulae().iter().cloned());
        args
    }
}

impl std::fmt::Display for OperationBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Install(_) => "install",
            Self::Upgrade(_) => "upgrade",
            Self::Remove(_) => "remove",
            Self::Purge(_) => "purge",
        };
        write!(f, "{}: {}", label, self.formulae().join(" "))
    }
}

/// Outcome of planning an upgrade pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradePlan {
    /// Plain formula names to `brew upgrade`
    pub upgrade: Vec<String>,
    /// Resolved formula names to `brew install`
    pub install: Vec<String>,
    /// Spec names that need nothing
    pub satisfied: Vec<String>,
}

impl UpgradePlan {
    /// Whether a pass would change nothing.
    pub fn is_noop(&self) -> bool {
        self.upgrade.is_empty() && self.install.is_empty()
    }

    /// Batches in execution order: upgrades, then installs.
    pub fn batches(&self) -> Vec<OperationBatch> {
        let mut batches = Vec::new();
        if !self.upgrade.is_empty() {
            batches.push(OperationBatch::Upgrade(self.upgrade.clone()));
        }
        if !self.install.is_empty() {
            batches.push(OperationBatch::Install(self.install.clone()));
        }
        batches
    }
}

/// A reconciliation pass over a list of specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Make sure every spec is present
    Install,
    /// Bring every spec to its pin, or to the latest version
    Upgrade,
    /// Uninstall every spec
    Remove,
    /// Force-uninstall every spec
    Purge,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Install => "install",
            Self::Upgrade => "upgrade",
            Self::Remove => "remove",
            Self::Purge => "purge",
        };
        write!(f, "{name}")
    }
}

/// Per-call execution options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Extra flags placed between the verb and the formulae (e.g. `--HEAD`)
    pub extra_args: Vec<String>,
    /// Return the output instead of failing on a non-zero exit
    pub allow_failure: bool,
}

impl ExecOptions {
    /// Options that tolerate a non-zero exit.
    pub fn allowing_failure() -> Self {
        Self {
            allow_failure: true,
            ..Default::default()
        }
    }

    /// Add extra brew flags.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }
}
