//! brewcore configuration (`config.toml`).
//!
//! ```toml
//! owner = "alice"
//! timeout_secs = 1800
//! options = ["--force-bottle"]
//!
//! [[packages]]
//! name = "git"
//!
//! [[packages]]
//! name = "node"
//! version = "20.11.1"
//! ```

use anyhow::{Context, Result};
use brewkit::host::DEFAULT_DISALLOWED_OWNERS;
use brewkit::resolver::DEFAULT_EXTRACT_TAP;
use brewkit::{Client, HostOptions, PackageSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Homebrew owner account; detected when unset
    pub owner: Option<String>,
    /// Homebrew root; derived from the architecture when unset
    pub root: Option<String>,
    /// Ceiling for a single brew invocation, in seconds
    pub timeout_secs: u64,
    /// Tap that receives extracted versioned formulae
    pub extract_tap: String,
    /// Owners brew is never run as
    pub disallowed_owners: Vec<String>,
    /// Extra flags for install, upgrade and uninstall
    pub options: Vec<String>,
    /// Desired formulae, used when no packages are given on the command line
    pub packages: Vec<PackageSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: None,
            root: None,
            timeout_secs: 1800,
            extract_tap: DEFAULT_EXTRACT_TAP.to_string(),
            disallowed_owners: DEFAULT_DISALLOWED_OWNERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            options: Vec::new(),
            packages: Vec::new(),
        }
    }
}

impl Config {
    /// Load the config from `path`, or from the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = paths::config_file()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    log::debug!("No config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load and parse a config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Parse config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        Ok(config)
    }

    /// Expanded Homebrew root, if configured.
    pub fn root_path(&self) -> Option<PathBuf> {
        self.root.as_deref().map(paths::expand)
    }

    /// Per-invocation timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Inputs for host detection.
    pub fn host_options(&self) -> HostOptions {
        HostOptions {
            owner: self.owner.clone(),
            root: self.root_path(),
            disallowed_owners: self.disallowed_owners.clone(),
        }
    }

    /// Build a client for this machine.
    pub fn client(&self, dry_run: bool) -> Result<Client> {
        let client = Client::detect(&self.host_options()).context("Homebrew is not usable")?;
        Ok(client
            .with_timeout(self.timeout())
            .with_tap(self.extract_tap.clone())
            .with_brew_args(self.options.iter().cloned())
            .with_dry_run(dry_run))
    }
}
