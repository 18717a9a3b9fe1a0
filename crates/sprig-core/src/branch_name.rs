//! Branch name validation and newtype.
//!
//! Provides [`validate_name`] and a [`BranchName`] type that carries the
//! check in the type system, so names that fail git's ref rules are rejected
//! before any command reaches git.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Characters git refuses anywhere in a ref name.
const FORBIDDEN: &[char] = &['~', '^', ':', '?', '*', '[', ']', '\\'];

/// A validated git branch name.
///
/// # Examples
///
/// ```
/// use sprig_core::BranchName;
///
/// assert!(BranchName::new("feature/user-auth-v2").is_ok());
///
/// assert!(BranchName::new("feature//test").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("feature~1").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if the name violates the naming rules.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self(name))
    }

    /// Get the branch name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the `BranchName` and return the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for BranchName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<str> for BranchName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for BranchName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Serialize for BranchName {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BranchName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> Error {
    Error::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a branch name against git's ref naming rules.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] with the first rule the name breaks.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "branch name cannot be empty"));
    }

    if name.starts_with('.') {
        return Err(invalid(name, "branch name cannot start with '.'"));
    }

    if name.starts_with('-') {
        return Err(invalid(name, "branch name cannot start with '-'"));
    }

    // git's rule is case-sensitive
    #[allow(clippy::case_sensitive_file_extension_comparisons)]
    if name.ends_with(".lock") {
        return Err(invalid(name, "branch name cannot end with '.lock'"));
    }

    if name.ends_with('.') {
        return Err(invalid(name, "branch name cannot end with '.'"));
    }

    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid(name, "branch name cannot start or end with '/'"));
    }

    if name.contains("..") {
        return Err(invalid(name, "branch name cannot contain '..'"));
    }

    if name.contains("//") {
        return Err(invalid(name, "branch name cannot contain '//'"));
    }

    if name.contains("/.") {
        return Err(invalid(name, "branch name component cannot start with '.'"));
    }

    if name.contains("@{") {
        return Err(invalid(name, "branch name cannot contain '@{'"));
    }

    for c in name.chars() {
        if c.is_whitespace() {
            return Err(invalid(name, "branch name cannot contain whitespace"));
        }
        if c.is_control() {
            return Err(invalid(name, "branch name cannot contain control characters"));
        }
        if FORBIDDEN.contains(&c) {
            return Err(invalid(name, format!("branch name cannot contain '{c}'")));
        }
    }

    Ok(())
}
