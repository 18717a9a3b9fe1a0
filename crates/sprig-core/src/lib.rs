//! # sprig-core
//!
//! Branch and merge intelligence over git.
//!
//! Turns `git branch -vv` text into typed [`Branch`] records, classifies
//! branches by name and protection, manages their lifecycle, predicts merge
//! conflicts and runs merges and rebases with conflict-aware state
//! tracking. Every engine is generic over [`sprig_git::GitOps`] and every
//! call that reaches git takes a cancellable [`Context`].

mod args;
pub mod branch;
pub mod branch_name;
pub mod classify;
pub mod config;
pub mod conflict;
pub mod error;
pub mod manager;
pub mod merge;
pub mod registry;

#[cfg(test)]
mod test_mocks;

pub use branch::{Branch, ListingEntry, parse_entry, parse_line, parse_listing};
pub use branch_name::{BranchName, validate_name};
pub use classify::{BranchType, ProtectionPolicy, ProtectionRule, infer_type, is_protected};
pub use config::Config;
pub use conflict::{Conflict, ConflictPredictor, ConflictType, Difficulty, MergeResult};
pub use error::{Error, Result};
pub use manager::{BranchManager, CreateOptions, DeleteOptions, DeleteOutcome};
pub use merge::{
    MergeOptions, MergeOrchestrator, MergeReport, MergeState, RebaseOptions, RebaseReport,
    Strategy,
};
pub use registry::{BranchRegistry, ListOptions, SortBy, list_branches};
pub use sprig_git::Context;
