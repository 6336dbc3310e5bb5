//! Error types for Homebrew reconciliation.
//!
//! Only execution-level problems surface as errors. Query and resolution
//! problems are absorbed where they happen (a failed `brew info` reads as
//! "not installed", an unsatisfiable pin drops the package), so everything
//! here describes either a broken host or a failed batch.

use std::time::Duration;
use thiserror::Error;

/// Categories of failed `brew` invocations.
///
/// Derived from stderr so the caller can print something more useful than
/// a raw exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors (download, DNS, TLS)
    Network,
    /// Formula not found in any tap
    NotFound,
    /// Version or dependency conflict
    Conflict,
    /// Permission denied in the Homebrew prefix
    Permission,
    /// Formula is already installed
    AlreadyInstalled,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Classify a failed brew invocation from its stderr.
    pub fn from_stderr(stderr: &str) -> Self {
        let stderr = stderr.to_lowercase();
        let any = |needles: &[&str]| needles.iter().any(|n| stderr.contains(n));

        if any(&[
            "curl: (",
            "could not resolve",
            "connection refused",
            "timed out",
            "network",
            "ssl",
            "certificate",
            "failed to download",
            "sha256 mismatch",
        ]) {
            Self::Network
        } else if any(&[
            "no available formula",
            "no formulae found",
            "no such keg",
            "couldn't find",
            "is not installed",
        ]) {
            Self::NotFound
        } else if any(&["already installed", "is already an installed"]) {
            Self::AlreadyInstalled
        } else if any(&["conflict", "depends on", "is a dependency", "refusing to uninstall"]) {
            Self::Conflict
        } else if any(&["permission denied", "operation not permitted", "cannot write"]) {
            Self::Permission
        } else {
            Self::Other
        }
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Formula not found",
            Self::Conflict => "Formula conflict",
            Self::Permission => "Permission denied",
            Self::AlreadyInstalled => "Already installed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and try again",
            Self::NotFound => "Verify the formula name, pinned version, or required tap",
            Self::Conflict => "Unlink or remove the conflicting formula, or purge instead of remove",
            Self::Permission => "Check that the Homebrew owner owns the prefix directories",
            Self::AlreadyInstalled => "No action needed - formula is already installed",
            Self::Other => "Check the captured stderr for more information",
        }
    }
}

/// Errors that can occur while reconciling Homebrew formulae.
#[derive(Debug, Error)]
pub enum Error {
    /// The brew binary does not exist under the resolved prefix
    #[error("Homebrew not found at {path}. Install it from https://brew.sh")]
    BrewNotFound {
        /// Path where the brew binary was expected
        path: String,
    },

    /// Homebrew is installed for a different architecture than this process
    #[error("running under Rosetta emulation on Apple Silicon; refusing to drive {root}")]
    Emulated {
        /// Homebrew root that would have been used
        root: String,
    },

    /// The Homebrew owner could not be resolved to a local account
    #[error("Homebrew owner not found: {name}")]
    OwnerNotFound {
        /// Account name (or uid) that failed to resolve
        name: String,
    },

    /// The resolved owner is on the disallow list
    #[error("refusing to manage Homebrew as disallowed owner '{name}'")]
    DisallowedOwner {
        /// Disallowed account name
        name: String,
    },

    /// Brew must never run with uid 0
    #[error("refusing to run brew as a privileged user ({name}, uid 0)")]
    PrivilegedOwner {
        /// Name of the privileged account
        name: String,
    },

    /// A brew batch exited non-zero
    #[error("brew {verb} failed for [{}] (exit {}): {stderr}", .formulae.join(", "), .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    Execution {
        /// Verb passed to brew (install, upgrade, uninstall, ...)
        verb: String,
        /// Every formula in the failed batch
        formulae: Vec<String>,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
        /// Category derived from stderr
        category: ErrorCategory,
    },

    /// A brew invocation exceeded its time ceiling and was killed
    #[error("brew {verb} timed out after {}s for [{}]", .timeout.as_secs(), .formulae.join(", "))]
    Timeout {
        /// Verb passed to brew
        verb: String,
        /// Every formula in the batch
        formulae: Vec<String>,
        /// The ceiling that was exceeded
        timeout: Duration,
    },

    /// The process could not be spawned
    #[error("failed to execute {program}: {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// System call error from account lookup
    #[error("system error: {0}")]
    Sys(#[from] nix::Error),
}

impl Error {
    /// Category of a failed batch, if this is an execution error.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Error::Execution { category, .. } => Some(*category),
            _ => None,
        }
    }

    /// Formulae of the failed batch, empty for host-level errors.
    pub fn formulae(&self) -> &[String] {
        match self {
            Error::Execution { formulae, .. } | Error::Timeout { formulae, .. } => formulae,
            _ => &[],
        }
    }
}

/// Result type for brewkit operations.
pub type Result<T> = std::result::Result<T, Error>;
