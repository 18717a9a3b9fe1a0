//! # sprig-git
//!
//! Process boundary between sprig and the `git` binary.
//! Provides cancellable invocations, typed porcelain queries,
//! repository state probes and the branch/merge/rebase commands
//! the core engine builds on.

mod context;
mod error;
mod repository;
pub mod runner;
pub mod traits;
mod types;

pub use context::Context;
pub use error::{Error, Result};
pub use repository::Repository;
pub use runner::CommandOutput;
pub use traits::GitOps;
pub use types::{ChangeKind, EMPTY_TREE, ListingScope, PathChange, RefDetails, RepoState};
