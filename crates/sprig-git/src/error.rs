//! Error types for sprig-git.

use std::path::PathBuf;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while invoking git.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The path is not inside a git repository.
    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// git ran and exited unsuccessfully.
    ///
    /// `stderr` carries git's own diagnostic text unmodified.
    #[error("`{command}` failed (exit code {exit_code}): {}", .stderr.trim())]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Exit code, or -1 when the process was killed by a signal.
        exit_code: i32,
        /// Captured standard error.
        stderr: String,
    },

    /// The git binary could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        /// The command line that was attempted.
        command: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The invocation context was cancelled or its deadline passed.
    #[error("`{command}` cancelled")]
    Cancelled {
        /// The command line that was interrupted.
        command: String,
    },

    /// IO error while talking to the child process or reading the git dir.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// git's diagnostic text, when the failure came from git itself.
    #[must_use]
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// Whether this error is the result of cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
