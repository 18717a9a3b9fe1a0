//! Branch classification: naming category and protection status.
//!
//! Both are pure functions of the branch name and run independently of each
//! other; a `release/*` branch is a [`BranchType::Release`] and protected,
//! but neither answer feeds into the other.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Patterns protected out of the box.
pub const DEFAULT_PROTECTED: &[&str] = &[
    "main",
    "master",
    "develop",
    "development",
    "release/*",
    "hotfix/*",
];

/// Naming category inferred from a branch's leading path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchType {
    Feature,
    Fix,
    Hotfix,
    Release,
    Experiment,
    Other,
}

impl BranchType {
    /// Lowercase label, as used in listings and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Fix => "fix",
            Self::Hotfix => "hotfix",
            Self::Release => "release",
            Self::Experiment => "experiment",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for BranchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infer a branch's type from the segment before the first `/`.
///
/// Names without a `/` are always [`BranchType::Other`].
#[must_use]
pub fn infer_type(name: &str) -> BranchType {
    let Some((prefix, _)) = name.split_once('/') else {
        return BranchType::Other;
    };
    match prefix {
        "feature" => BranchType::Feature,
        "fix" => BranchType::Fix,
        "hotfix" => BranchType::Hotfix,
        "release" => BranchType::Release,
        "experiment" => BranchType::Experiment,
        _ => BranchType::Other,
    }
}

/// One protection pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtectionRule {
    /// Matches exactly this name.
    Exact(String),
    /// `prefix/*`: matches `prefix/<one segment>`, never deeper paths and
    /// never the bare prefix.
    PrefixWildcard(String),
}

impl ProtectionRule {
    /// Parse `name` or `prefix/*`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] for empty patterns or a `*`
    /// anywhere other than a trailing `/*` segment.
    pub fn parse(pattern: &str) -> Result<Self> {
        let rule = match pattern.strip_suffix("/*") {
            Some(prefix) => Self::PrefixWildcard(prefix.to_string()),
            None => Self::Exact(pattern.to_string()),
        };
        let fixed = match &rule {
            Self::Exact(name) | Self::PrefixWildcard(name) => name,
        };
        if fixed.is_empty() || fixed.contains('*') {
            return Err(Error::InvalidArgument(format!(
                "unsupported protection pattern '{pattern}'"
            )));
        }
        Ok(rule)
    }

    /// Check whether `name` is covered by this rule.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == name,
            Self::PrefixWildcard(prefix) => name
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .is_some_and(|segment| !segment.is_empty() && !segment.contains('/')),
        }
    }
}

impl fmt::Display for ProtectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::PrefixWildcard(prefix) => write!(f, "{prefix}/*"),
        }
    }
}

/// An ordered set of protection rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionPolicy {
    rules: Vec<ProtectionRule>,
}

impl ProtectionPolicy {
    /// A policy with no rules at all.
    #[must_use]
    pub const fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add extra patterns on top of the current rules.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if a pattern is unsupported.
    pub fn extend<I, S>(mut self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            let rule = ProtectionRule::parse(pattern.as_ref())?;
            if !self.rules.contains(&rule) {
                self.rules.push(rule);
            }
        }
        Ok(self)
    }

    /// The rules, in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[ProtectionRule] {
        &self.rules
    }

    /// The first rule covering `name`, if any.
    #[must_use]
    pub fn matching_rule(&self, name: &str) -> Option<&ProtectionRule> {
        self.rules.iter().find(|rule| rule.matches(name))
    }

    /// Check whether `name` is protected.
    #[must_use]
    pub fn is_protected(&self, name: &str) -> bool {
        self.matching_rule(name).is_some()
    }
}

impl Default for ProtectionPolicy {
    fn default() -> Self {
        Self {
            rules: DEFAULT_PROTECTED
                .iter()
                .map(|pattern| match pattern.strip_suffix("/*") {
                    Some(prefix) => ProtectionRule::PrefixWildcard(prefix.to_string()),
                    None => ProtectionRule::Exact((*pattern).to_string()),
                })
                .collect(),
        }
    }
}

/// Check `name` against the built-in protection list.
#[must_use]
pub fn is_protected(name: &str) -> bool {
    ProtectionPolicy::default().is_protected(name)
}
