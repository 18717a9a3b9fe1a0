//! Configuration management for sprig.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sprig_git::Context;

use crate::classify::{ProtectionPolicy, ProtectionRule};
use crate::error::{Error, Result};
use crate::merge::Strategy;

/// Sprig configuration loaded from `.git/sprig/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Branch lifecycle settings.
    #[serde(default)]
    pub branch: BranchConfig,

    /// Merge settings.
    #[serde(default)]
    pub merge: MergeConfig,
}

impl Config {
    /// Location of the config file inside a git directory.
    #[must_use]
    pub fn path_for(git_dir: &Path) -> PathBuf {
        git_dir.join("sprig").join("config.toml")
    }

    /// Load config from a TOML file, falling back to defaults when it is absent.
    ///
    /// # Errors
    /// Returns error if the file can't be read or parsed, or lists an
    /// unsupported protection pattern.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        for pattern in &config.branch.protected {
            ProtectionRule::parse(pattern).map_err(|e| Error::Config {
                file: path.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        Ok(config)
    }

    /// Save config to a TOML file, creating its directory.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::other(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// The built-in protection list extended with `[branch] protected`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] for an unsupported pattern.
    pub fn protection_policy(&self) -> Result<ProtectionPolicy> {
        ProtectionPolicy::default().extend(&self.branch.protected)
    }

    /// Per-invocation timeout, `None` when unbounded.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        match self.general.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// A fresh invocation context honoring the configured timeout.
    #[must_use]
    pub fn context(&self) -> Context {
        self.timeout()
            .map_or_else(Context::background, Context::with_timeout)
    }
}

/// General sprig settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Remote used when deleting remote branches.
    #[serde(default = "default_remote")]
    pub default_remote: String,

    /// Seconds before a git invocation is killed; 0 means no limit.
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_remote: default_remote(),
            timeout_secs: 0,
        }
    }
}

fn default_remote() -> String {
    "origin".into()
}

/// Branch lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchConfig {
    /// Extra protected patterns (`name` or `prefix/*`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protected: Vec<String>,

    /// Validate names on create unless told otherwise.
    #[serde(default = "default_validate_names")]
    pub validate_names: bool,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            protected: Vec::new(),
            validate_names: default_validate_names(),
        }
    }
}

const fn default_validate_names() -> bool {
    true
}

/// Merge settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Strategy used when none is given.
    #[serde(default)]
    pub default_strategy: Strategy,
}
