//! Host facts needed to drive Homebrew: who owns it, where it lives, and
//! which architecture it was installed for.
//!
//! Everything here is computed once by [`HostEnvironment::detect`] and then
//! passed by reference; nothing is memoized behind the caller's back.

use crate::error::{Error, Result};
use nix::unistd::{Uid, User};
use serde::Serialize;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Owners Homebrew must never be managed as.
pub const DEFAULT_DISALLOWED_OWNERS: &[&str] = &["root", "_mbsetupuser"];

/// Hardware family Homebrew was installed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Arch {
    /// arm64 (prefix `/opt/homebrew`)
    AppleSilicon,
    /// x86_64 (prefix `/usr/local`)
    Intel,
}

impl Arch {
    /// Default Homebrew root for this architecture.
    pub fn default_root(&self) -> PathBuf {
        match self {
            Arch::AppleSilicon => PathBuf::from("/opt/homebrew"),
            Arch::Intel => PathBuf::from("/usr/local"),
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arch::AppleSilicon => write!(f, "arm64"),
            Arch::Intel => write!(f, "x86_64"),
        }
    }
}

/// The unprivileged account that owns the Homebrew installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Owner {
    /// Account name
    pub name: String,
    /// Numeric user id
    pub uid: u32,
    /// Primary group id
    pub gid: u32,
    /// Home directory
    pub home: PathBuf,
}

impl Owner {
    /// Look up an account by name.
    pub fn from_name(name: &str) -> Result<Self> {
        User::from_name(name)?
            .map(Self::from)
            .ok_or_else(|| Error::OwnerNotFound {
                name: name.to_string(),
            })
    }

    /// Look up an account by uid.
    pub fn from_uid(uid: u32) -> Result<Self> {
        User::from_uid(Uid::from_raw(uid))?
            .map(Self::from)
            .ok_or_else(|| Error::OwnerNotFound {
                name: uid.to_string(),
            })
    }

    /// Whether this is the superuser.
    pub fn is_root(&self) -> bool {
        self.uid == 0
    }
}

impl From<User> for Owner {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home: user.dir,
        }
    }
}

/// Inputs for host detection, usually from configuration.
#[derive(Debug, Clone)]
pub struct HostOptions {
    /// Explicit owner name; detected when `None`
    pub owner: Option<String>,
    /// Explicit Homebrew root; derived from the architecture when `None`
    pub root: Option<PathBuf>,
    /// Owners that are rejected
    pub disallowed_owners: Vec<String>,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            owner: None,
            root: None,
            disallowed_owners: DEFAULT_DISALLOWED_OWNERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Owner identity, architecture and Homebrew paths for this machine.
#[derive(Debug, Clone, Serialize)]
pub struct HostEnvironment {
    owner: Owner,
    arch: Arch,
    emulated: bool,
    root: PathBuf,
}

impl HostEnvironment {
    /// Build an environment from known parts.
    pub fn new(owner: Owner, arch: Arch, root: impl Into<PathBuf>) -> Self {
        Self {
            owner,
            arch,
            emulated: false,
            root: root.into(),
        }
    }

    /// Detect the environment of the running machine.
    pub fn detect(options: &HostOptions) -> Result<Self> {
        let hardware_arm64 = hardware_is_arm64();
        let process_arm64 = std::env::consts::ARCH == "aarch64";
        let arch = if hardware_arm64 || process_arm64 {
            Arch::AppleSilicon
        } else {
            Arch::Intel
        };
        let emulated = hardware_arm64 && !process_arm64;

        let root = options.root.clone().unwrap_or_else(|| arch.default_root());
        let bin = root.join("bin").join("brew");

        let owner = match &options.owner {
            Some(name) => Owner::from_name(name)?,
            None => detect_owner(&bin)?,
        };
        log::debug!("Homebrew owner is {} (uid {})", owner.name, owner.uid);

        check_allowed(&owner, &options.disallowed_owners)?;

        Ok(Self {
            owner,
            arch,
            emulated,
            root,
        })
    }

    /// The Homebrew owner.
    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Architecture Homebrew is installed for.
    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// Whether this process runs translated on Apple Silicon.
    pub fn is_emulated(&self) -> bool {
        self.emulated
    }

    /// Homebrew root (`/opt/homebrew` or `/usr/local`).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the brew binary.
    pub fn prefix(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// Path to the brew binary.
    pub fn bin(&self) -> PathBuf {
        self.prefix().join("brew")
    }

    /// Homebrew repository checkout.
    pub fn repository(&self) -> PathBuf {
        match self.arch {
            Arch::AppleSilicon => self.root.clone(),
            Arch::Intel => self.root.join("Homebrew"),
        }
    }

    /// Whether a usable brew binary is present.
    pub fn brew_exists(&self) -> bool {
        !self.emulated && self.bin().exists()
    }

    /// Fail unless brew can be driven from this process.
    pub fn ensure_brew(&self) -> Result<()> {
        if self.emulated {
            return Err(Error::Emulated {
                root: self.root.display().to_string(),
            });
        }
        if !self.bin().exists() {
            return Err(Error::BrewNotFound {
                path: self.bin().display().to_string(),
            });
        }
        Ok(())
    }
}

/// Reject owners on the disallow list.
pub fn check_allowed(owner: &Owner, disallowed: &[String]) -> Result<()> {
    if disallowed.iter().any(|d| d == &owner.name) {
        return Err(Error::DisallowedOwner {
            name: owner.name.clone(),
        });
    }
    Ok(())
}

/// Owner uid of a file.
pub fn owner_uid_of(path: &Path) -> Result<u32> {
    Ok(std::fs::metadata(path)?.uid())
}

/// Find the Homebrew owner: whoever owns the brew binary, else the user
/// that invoked sudo, else the current user.
fn detect_owner(bin: &Path) -> Result<Owner> {
    if let Ok(uid) = owner_uid_of(bin) {
        return Owner::from_uid(uid);
    }

    if let Ok(name) = std::env::var("SUDO_USER")
        && !name.is_empty()
    {
        return Owner::from_name(&name);
    }

    Owner::from_uid(nix::unistd::getuid().as_raw())
}

fn hardware_is_arm64() -> bool {
    Command::new("/usr/sbin/sysctl")
        .args(["-n", "hw.optional.arm64"])
        .output()
        .map(|o| o.status.success() && String::from_utf8_lossy(&o.stdout).trim() == "1")
        .unwrap_or(false)
}
