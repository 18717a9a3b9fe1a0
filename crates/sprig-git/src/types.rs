//! Plain data returned by git queries.

use std::fs;
use std::path::Path;

/// The tree git uses for "nothing": diffing against it lists every file.
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// In-progress operation recorded by git's marker files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    /// No operation in progress.
    Clean,
    /// `MERGE_HEAD` present.
    Merge,
    /// `rebase-merge/` present (merge backend or interactive).
    RebaseMerge,
    /// `rebase-apply/` present without `applying` (apply backend).
    RebaseApply,
    /// `rebase-apply/applying` present (`git am`).
    ApplyMailbox,
    /// `CHERRY_PICK_HEAD` present.
    CherryPick,
    /// `REVERT_HEAD` present.
    Revert,
}

impl RepoState {
    /// Read the state from the marker files under `git_dir`.
    ///
    /// Nothing is cached: every call looks at the filesystem again.
    #[must_use]
    pub fn probe(git_dir: &Path) -> Self {
        let rebase_apply = git_dir.join("rebase-apply");
        if git_dir.join("rebase-merge").is_dir() {
            Self::RebaseMerge
        } else if rebase_apply.join("applying").exists() {
            Self::ApplyMailbox
        } else if rebase_apply.is_dir() {
            Self::RebaseApply
        } else if git_dir.join("MERGE_HEAD").exists() {
            Self::Merge
        } else if git_dir.join("CHERRY_PICK_HEAD").exists() {
            Self::CherryPick
        } else if git_dir.join("REVERT_HEAD").exists() {
            Self::Revert
        } else {
            Self::Clean
        }
    }

    /// The commit an in-progress rebase replays onto, as recorded under `git_dir`.
    #[must_use]
    pub fn rebase_onto(git_dir: &Path) -> Option<String> {
        ["rebase-merge", "rebase-apply"]
            .iter()
            .find_map(|dir| fs::read_to_string(git_dir.join(dir).join("onto")).ok())
            .map(|onto| onto.trim().to_string())
            .filter(|onto| !onto.is_empty())
    }

    /// Whether a rebase of either backend is in progress.
    #[must_use]
    pub const fn is_rebasing(self) -> bool {
        matches!(self, Self::RebaseMerge | Self::RebaseApply)
    }
}

/// How a path changed between two trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// `A`
    Added,
    /// `M`
    Modified,
    /// `D`
    Deleted,
    /// `T`
    TypeChanged,
    /// Anything else git reports (`U`, `X`, ...).
    Other,
}

impl ChangeKind {
    /// Map a `--name-status` letter.
    #[must_use]
    pub fn from_status(status: &str) -> Self {
        match status.chars().next() {
            Some('A') => Self::Added,
            Some('M') => Self::Modified,
            Some('D') => Self::Deleted,
            Some('T') => Self::TypeChanged,
            _ => Self::Other,
        }
    }
}

/// One path touched between two trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathChange {
    /// Path relative to the repository root.
    pub path: String,
    /// The kind of change.
    pub kind: ChangeKind,
    /// git treats the content as binary.
    pub binary: bool,
}

/// Which refs a branch listing covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingScope {
    /// Include remote-tracking branches.
    pub all: bool,
    /// Only branches merged into `HEAD`.
    pub merged: bool,
}

/// Per-ref metadata from `git for-each-ref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefDetails {
    /// Fully-qualified ref name.
    pub reference: String,
    /// Short name of the configured upstream, `None` when untracked.
    pub upstream: Option<String>,
    /// Committer timestamp of the tip, seconds since the epoch.
    pub committer_date: i64,
    /// Author name of the tip commit.
    pub author: String,
}
