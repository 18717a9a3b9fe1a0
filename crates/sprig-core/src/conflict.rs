//! Conflict prediction.
//!
//! Compares what each side changed since the merge base and flags every path
//! both sides touched. Only query commands are issued, so prediction never
//! changes refs, the index or the working tree. The answer is advisory: git's
//! own merge may still resolve a flagged path cleanly.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use sprig_git::{ChangeKind, Context, EMPTY_TREE, GitOps, PathChange};
use tracing::{debug, warn};

use crate::args::{require_name, require_repo};
use crate::error::{Error, GitResultExt, Result};

/// How a path conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictType {
    /// Both sides edited the file.
    Content,
    /// Both sides added a file at the same path.
    AddAdd,
    /// One side deleted what the other changed.
    ModifyDelete,
    /// Either side's version is binary.
    Binary,
}

impl ConflictType {
    fn classify(ours: &PathChange, theirs: &PathChange) -> Self {
        if ours.binary || theirs.binary {
            Self::Binary
        } else if ours.kind == ChangeKind::Added && theirs.kind == ChangeKind::Added {
            Self::AddAdd
        } else if ours.kind == ChangeKind::Deleted || theirs.kind == ChangeKind::Deleted {
            Self::ModifyDelete
        } else {
            Self::Content
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Content => "content",
            Self::AddAdd => "add/add",
            Self::ModifyDelete => "modify/delete",
            Self::Binary => "binary",
        })
    }
}

/// A path likely to conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub path: String,
    pub conflict_type: ConflictType,
}

/// Rough effort needed to finish a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Fast-forward; no merge commit needed.
    Trivial,
    /// A merge commit, but no conflicts.
    Clean,
    /// One or two conflicts.
    Moderate,
    /// Three or more conflicts, or any binary conflict.
    Complex,
}

impl Difficulty {
    /// Derive the difficulty from the fast-forward flag and the conflicts.
    #[must_use]
    pub fn assess(can_fast_forward: bool, conflicts: &[Conflict]) -> Self {
        if can_fast_forward {
            Self::Trivial
        } else if conflicts.is_empty() {
            Self::Clean
        } else if conflicts.len() >= 3
            || conflicts
                .iter()
                .any(|c| c.conflict_type == ConflictType::Binary)
        {
            Self::Complex
        } else {
            Self::Moderate
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Trivial => "trivial",
            Self::Clean => "clean",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        })
    }
}

/// Prediction for merging `source` into `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeResult {
    pub source: String,
    pub target: String,
    pub source_revision: String,
    pub target_revision: String,
    /// Common ancestor, `None` for unrelated histories.
    pub merge_base: Option<String>,
    pub can_fast_forward: bool,
    /// `source` is already contained in `target`.
    pub up_to_date: bool,
    /// Ordered by path.
    pub conflicts: Vec<Conflict>,
    pub difficulty: Difficulty,
}

impl MergeResult {
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Predicts merge conflicts between two refs.
pub struct ConflictPredictor<'a, G: GitOps> {
    repo: &'a G,
}

impl<'a, G: GitOps> ConflictPredictor<'a, G> {
    pub const fn new(repo: &'a G) -> Self {
        Self { repo }
    }

    /// Predict the outcome of merging `source` into `target`.
    ///
    /// Fast-forwardable and already-merged sources report no conflicts.
    /// Otherwise every path changed on both sides since the merge base is
    /// a conflict candidate; paths deleted on both sides are not.
    ///
    /// # Errors
    /// Returns [`Error::RefNotFound`] if either ref does not resolve to a
    /// commit, or a wrapped git failure.
    pub fn detect_conflicts(
        &self,
        ctx: &Context,
        source: &str,
        target: &str,
    ) -> Result<MergeResult> {
        require_repo(self.repo)?;
        require_name("source ref", source)?;
        require_name("target ref", target)?;

        let source_revision = self.resolve(ctx, source)?;
        let target_revision = self.resolve(ctx, target)?;

        let merge_base = self
            .repo
            .merge_base(ctx, &source_revision, &target_revision)
            .during("find merge base", &format!("{source}...{target}"))?;

        let can_fast_forward = self
            .repo
            .is_ancestor(ctx, &target_revision, &source_revision)
            .during("check ancestry", target)?;
        let up_to_date = self
            .repo
            .is_ancestor(ctx, &source_revision, &target_revision)
            .during("check ancestry", source)?;

        let conflicts = if can_fast_forward || up_to_date {
            Vec::new()
        } else {
            let base = merge_base.as_deref().unwrap_or(EMPTY_TREE);
            let ours = self
                .repo
                .changed_paths(ctx, base, &target_revision)
                .during("diff", target)?;
            let theirs = self
                .repo
                .changed_paths(ctx, base, &source_revision)
                .during("diff", source)?;
            overlapping(&ours, &theirs)
        };

        let can_fast_forward = can_fast_forward || up_to_date;
        let difficulty = Difficulty::assess(can_fast_forward, &conflicts);
        if conflicts.is_empty() {
            debug!(source, target, %difficulty, "no conflicts predicted");
        } else {
            warn!(
                source,
                target,
                count = conflicts.len(),
                %difficulty,
                "conflicts predicted"
            );
        }

        Ok(MergeResult {
            source: source.to_string(),
            target: target.to_string(),
            source_revision,
            target_revision,
            merge_base,
            can_fast_forward,
            up_to_date,
            conflicts,
            difficulty,
        })
    }

    fn resolve(&self, ctx: &Context, rev: &str) -> Result<String> {
        self.repo
            .resolve_commit(ctx, rev)
            .during("resolve", rev)?
            .ok_or_else(|| Error::RefNotFound(rev.to_string()))
    }
}

/// Paths changed on both sides, ordered by path.
fn overlapping(ours: &[PathChange], theirs: &[PathChange]) -> Vec<Conflict> {
    let ours: BTreeMap<&str, &PathChange> = ours.iter().map(|c| (c.path.as_str(), c)).collect();
    let mut conflicts: BTreeMap<&str, ConflictType> = BTreeMap::new();
    for change in theirs {
        let Some(other) = ours.get(change.path.as_str()) else {
            continue;
        };
        if other.kind == ChangeKind::Deleted && change.kind == ChangeKind::Deleted {
            continue;
        }
        conflicts.insert(&change.path, ConflictType::classify(other, change));
    }
    conflicts
        .into_iter()
        .map(|(path, conflict_type)| Conflict {
            path: path.to_string(),
            conflict_type,
        })
        .collect()
}
