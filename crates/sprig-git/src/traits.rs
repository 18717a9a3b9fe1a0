//! Trait abstractions for git operations.
//!
//! This module defines the `GitOps` trait which abstracts git operations,
//! enabling dependency injection and testability.

use std::path::Path;

use crate::{Context, ListingScope, PathChange, RefDetails, RepoState, Result};

/// Trait for git repository operations.
///
/// This trait abstracts git operations, allowing for:
/// - Dependency injection in the branch and merge engines
/// - Scripted implementations for testing
///
/// Every method that talks to git takes a [`Context`]; cancelling it kills
/// the running process.
#[allow(clippy::missing_errors_doc)]
pub trait GitOps {
    // === Repository Info ===

    /// Get the working directory path, `None` for bare repositories.
    fn workdir(&self) -> Option<&Path>;

    /// Get the path to the git directory.
    fn git_dir(&self) -> &Path;

    /// Probe git's marker files for an in-progress operation.
    fn state(&self) -> RepoState;

    /// The commit an in-progress rebase replays onto, `None` when git has not recorded one.
    fn rebase_onto(&self) -> Option<String>;

    /// Short name of the checked-out branch, `None` when HEAD is detached.
    fn current_branch(&self, ctx: &Context) -> Result<Option<String>>;

    // === Queries ===

    /// Raw `git branch -vv` listing text.
    fn branch_listing(&self, ctx: &Context, scope: ListingScope) -> Result<String>;

    /// Upstream, tip date and author for every local branch, and for
    /// remote-tracking branches too when `all` is set.
    fn ref_details(&self, ctx: &Context, all: bool) -> Result<Vec<RefDetails>>;

    /// Resolve a revision expression to a full commit hash.
    ///
    /// Returns `None` when git cannot resolve it.
    fn resolve_commit(&self, ctx: &Context, rev: &str) -> Result<Option<String>>;

    /// Check whether a fully-qualified ref exists.
    fn ref_exists(&self, ctx: &Context, refname: &str) -> Result<bool>;

    /// Find the best common ancestor, `None` for unrelated histories.
    fn merge_base(&self, ctx: &Context, one: &str, two: &str) -> Result<Option<String>>;

    /// Check if `ancestor` is reachable from `descendant`.
    fn is_ancestor(&self, ctx: &Context, ancestor: &str, descendant: &str) -> Result<bool>;

    /// Paths changed between two tree-ishes, ordered by path.
    fn changed_paths(&self, ctx: &Context, from: &str, to: &str) -> Result<Vec<PathChange>>;

    /// Paths currently left unmerged in the index.
    fn unmerged_paths(&self, ctx: &Context) -> Result<Vec<String>>;

    // === Branch Operations ===

    /// Create a branch at `start` (HEAD when `None`).
    fn create_branch(
        &self,
        ctx: &Context,
        name: &str,
        start: Option<&str>,
        force: bool,
        track: bool,
    ) -> Result<()>;

    /// Checkout a branch.
    fn checkout(&self, ctx: &Context, name: &str) -> Result<()>;

    /// Delete a local branch; `force` deletes even if unmerged.
    fn delete_branch(&self, ctx: &Context, name: &str, force: bool) -> Result<()>;

    /// Delete a branch on a remote.
    fn delete_remote_branch(&self, ctx: &Context, remote: &str, name: &str) -> Result<()>;

    /// Rename a local branch.
    fn rename_branch(&self, ctx: &Context, old: &str, new: &str, force: bool) -> Result<()>;

    // === Merge / Rebase ===

    /// Merge `heads` into the current branch with extra `flags`.
    fn merge(&self, ctx: &Context, heads: &[&str], flags: &[&str]) -> Result<()>;

    /// Abort a merge in progress.
    fn merge_abort(&self, ctx: &Context) -> Result<()>;

    /// Rebase the current branch onto `onto`.
    fn rebase(&self, ctx: &Context, onto: &str, interactive: bool) -> Result<()>;

    /// Abort a rebase in progress.
    fn rebase_abort(&self, ctx: &Context) -> Result<()>;

    /// Continue a rebase after resolving conflicts.
    fn rebase_continue(&self, ctx: &Context) -> Result<()>;
}
