//! Error types for sprig-core.

use std::path::PathBuf;

use crate::merge::MergeState;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sprig-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required argument was missing or unusable. Raised before git runs.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid branch name.
    #[error("invalid branch name '{name}': {reason}")]
    InvalidName {
        /// The invalid name.
        name: String,
        /// Why the name is invalid.
        reason: String,
    },

    /// A branch listing line could not be parsed.
    ///
    /// This usually means git changed its output format.
    #[error("malformed branch listing line: {line:?}")]
    MalformedLine {
        /// The offending line.
        line: String,
    },

    /// A branch or ref does not exist.
    #[error("{what} '{name}' not found")]
    NotFound {
        /// What was looked up ("branch", "base", ...).
        what: &'static str,
        /// The name that was looked up.
        name: String,
    },

    /// Branch already exists.
    #[error("branch '{0}' already exists")]
    AlreadyExists(String),

    /// Destructive operation on a protected branch without force.
    #[error("branch '{0}' is protected - use force to override")]
    Protected(String),

    /// Attempt to delete the checked-out branch.
    #[error("branch '{0}' is checked out - switch to another branch first")]
    CurrentBranch(String),

    /// HEAD is detached (not on a branch).
    #[error("HEAD is detached - checkout a branch first")]
    DetachedHead,

    /// Abort or continue requested with nothing in progress.
    #[error("no merge or rebase in progress")]
    NoOperationInProgress,

    /// A merge or rebase is already in progress.
    #[error("repository is already {0} - resolve or abort first")]
    OperationInProgress(MergeState),

    /// Conflict prediction was given a ref git cannot resolve.
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// A merge stopped on conflicts; the repository is left merging.
    #[error("merge of '{branch}' stopped with conflicts in: {}", .paths.join(", "))]
    MergeConflict {
        /// The branch being merged.
        branch: String,
        /// Paths left unmerged.
        paths: Vec<String>,
    },

    /// A rebase stopped on conflicts; the repository is left rebasing.
    #[error("rebase onto '{onto}' stopped with conflicts in: {}", .paths.join(", "))]
    RebaseConflict {
        /// The upstream being rebased onto.
        onto: String,
        /// Paths left unmerged.
        paths: Vec<String>,
    },

    /// The invocation context was cancelled or timed out.
    #[error("operation cancelled")]
    Cancelled,

    /// A git command failed while performing `op` on `target`.
    #[error("{op} '{target}' failed: {source}")]
    Operation {
        /// The operation being performed.
        op: &'static str,
        /// The branch or ref involved.
        target: String,
        /// The underlying git failure, with git's stderr.
        #[source]
        source: sprig_git::Error,
    },

    /// Git operation error.
    #[error("git error: {0}")]
    Git(#[source] sprig_git::Error),

    /// Config file parsing error.
    #[error("failed to parse {file}: {message}")]
    Config { file: PathBuf, message: String },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Paths left in conflict by a merge or rebase, if this is a conflict error.
    #[must_use]
    pub fn conflict_paths(&self) -> Option<&[String]> {
        match self {
            Self::MergeConflict { paths, .. } | Self::RebaseConflict { paths, .. } => Some(paths),
            _ => None,
        }
    }
}

impl From<sprig_git::Error> for Error {
    fn from(err: sprig_git::Error) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Git(err)
        }
    }
}

/// Attach operation context to git-layer failures.
pub(crate) trait GitResultExt<T> {
    /// Wrap a failure as [`Error::Operation`], keeping cancellation distinct.
    fn during(self, op: &'static str, target: &str) -> Result<T>;
}

impl<T> GitResultExt<T> for sprig_git::Result<T> {
    fn during(self, op: &'static str, target: &str) -> Result<T> {
        self.map_err(|source| {
            if source.is_cancelled() {
                Error::Cancelled
            } else {
                Error::Operation {
                    op,
                    target: target.to_string(),
                    source,
                }
            }
        })
    }
}
