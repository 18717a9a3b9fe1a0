//! Merge and rebase orchestration.
//!
//! The orchestrator keeps no state of its own. Every decision re-reads git's
//! marker files, so an operation started or finished by hand in another
//! terminal is seen on the next call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sprig_git::{Context, GitOps, RepoState};
use tracing::{info, warn};

use crate::args::{require_name, require_repo};
use crate::conflict::{ConflictPredictor, MergeResult};
use crate::error::{Error, GitResultExt, Result};

/// What the working copy is in the middle of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeState {
    /// Idle.
    None,
    Merging,
    Rebasing,
}

impl MergeState {
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::None)
    }
}

impl From<RepoState> for MergeState {
    fn from(state: RepoState) -> Self {
        match state {
            RepoState::Merge => Self::Merging,
            RepoState::RebaseMerge | RepoState::RebaseApply => Self::Rebasing,
            RepoState::Clean
            | RepoState::ApplyMailbox
            | RepoState::CherryPick
            | RepoState::Revert => Self::None,
        }
    }
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Merging => "merging",
            Self::Rebasing => "rebasing",
        })
    }
}

/// Merge strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Only advance the ref; fail if a merge commit would be needed.
    FastForward,
    /// Three-way merge.
    #[default]
    Recursive,
    /// Record a merge but keep the current tree.
    Ours,
    /// Three-way merge preferring the incoming side on conflicting hunks.
    Theirs,
    /// Merge several heads at once.
    Octopus,
}

impl Strategy {
    pub const ALL: [Self; 5] = [
        Self::FastForward,
        Self::Recursive,
        Self::Ours,
        Self::Theirs,
        Self::Octopus,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FastForward => "fast-forward",
            Self::Recursive => "recursive",
            Self::Ours => "ours",
            Self::Theirs => "theirs",
            Self::Octopus => "octopus",
        }
    }

    /// Flags passed to `git merge` for this strategy.
    #[must_use]
    pub const fn flags(self) -> &'static [&'static str] {
        match self {
            Self::FastForward => &["--ff-only"],
            Self::Recursive => &["-s", "recursive"],
            Self::Ours => &["-s", "ours"],
            Self::Theirs => &["-X", "theirs"],
            Self::Octopus => &["-s", "octopus"],
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "ff" {
            return Ok(Self::FastForward);
        }
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown merge strategy '{s}'")))
    }
}

/// Options for [`MergeOrchestrator::execute`]. Defaults to a recursive merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub strategy: Strategy,
    /// Always create a merge commit.
    pub no_ff: bool,
    /// Stage the combined changes without committing.
    pub squash: bool,
    /// Resolve and predict only.
    pub dry_run: bool,
    /// Merge commit message.
    pub message: Option<String>,
    /// Further heads for an octopus merge.
    pub extra_heads: Vec<String>,
}

impl MergeOptions {
    fn check(&self) -> Result<()> {
        if self.squash && self.no_ff {
            return Err(Error::InvalidArgument(
                "squash and no-ff cannot be combined".into(),
            ));
        }
        if self.strategy == Strategy::FastForward && self.no_ff {
            return Err(Error::InvalidArgument(
                "the fast-forward strategy cannot be combined with no-ff".into(),
            ));
        }
        if !self.extra_heads.is_empty() && self.strategy != Strategy::Octopus {
            return Err(Error::InvalidArgument(
                "merging several branches needs the octopus strategy".into(),
            ));
        }
        Ok(())
    }
}

/// Options for [`MergeOrchestrator::rebase`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebaseOptions {
    /// Hand the todo list to the user's editor.
    pub interactive: bool,
    /// Resolve and predict only.
    pub dry_run: bool,
}

/// Outcome of a merge.
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub branch: String,
    pub strategy: Strategy,
    /// `HEAD` before the merge.
    pub before: String,
    /// `HEAD` after the merge; equal to `before` for dry runs and squashes.
    pub after: String,
    pub fast_forward: bool,
    pub squashed: bool,
    pub dry_run: bool,
    pub preflight: MergeResult,
}

/// Outcome of a rebase.
#[derive(Debug, Clone, Serialize)]
pub struct RebaseReport {
    pub onto: String,
    pub before: String,
    pub after: String,
    pub dry_run: bool,
    pub preflight: MergeResult,
}

/// Runs merges and rebases against the checked-out branch.
pub struct MergeOrchestrator<'a, G: GitOps> {
    repo: &'a G,
}

impl<'a, G: GitOps> MergeOrchestrator<'a, G> {
    pub const fn new(repo: &'a G) -> Self {
        Self { repo }
    }

    /// Current state, read from disk.
    #[must_use]
    pub fn state(&self) -> MergeState {
        MergeState::from(self.repo.state())
    }

    /// Whether a merge or rebase is in progress.
    #[must_use]
    pub fn in_progress(&self) -> bool {
        !self.state().is_idle()
    }

    /// Merge `branch` into the checked-out branch.
    ///
    /// A conflict leaves the repository merging; finish with a commit or
    /// call [`abort`](Self::abort).
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] for an empty name or incompatible options
    /// - [`Error::OperationInProgress`] if a merge or rebase is under way
    /// - [`Error::NotFound`] if `branch` does not resolve
    /// - [`Error::MergeConflict`] with the unmerged paths
    pub fn execute(&self, ctx: &Context, branch: &str, opts: &MergeOptions) -> Result<MergeReport> {
        require_repo(self.repo)?;
        require_name("branch", branch)?;
        for head in &opts.extra_heads {
            require_name("branch", head)?;
        }
        opts.check()?;
        self.require_idle()?;

        let source = self.resolve(ctx, "branch", branch)?;
        for head in &opts.extra_heads {
            self.resolve(ctx, "branch", head)?;
        }
        let before = self.resolve(ctx, "commit", "HEAD")?;

        let preflight = ConflictPredictor::new(self.repo)
            .detect_conflicts(ctx, branch, "HEAD")?;
        if preflight.has_conflicts() {
            warn!(
                branch,
                count = preflight.conflicts.len(),
                "merge may stop on conflicts"
            );
        }

        if opts.dry_run {
            let fast_forward = preflight.can_fast_forward
                && !preflight.up_to_date
                && !opts.no_ff
                && !opts.squash
                && opts.extra_heads.is_empty();
            info!(branch, strategy = %opts.strategy, "dry run, not merging");
            return Ok(MergeReport {
                branch: branch.to_string(),
                strategy: opts.strategy,
                after: before.clone(),
                before,
                fast_forward,
                squashed: opts.squash,
                dry_run: true,
                preflight,
            });
        }

        let mut flags: Vec<&str> = opts.strategy.flags().to_vec();
        if opts.no_ff {
            flags.push("--no-ff");
        }
        if opts.squash {
            flags.push("--squash");
        }
        if let Some(message) = &opts.message {
            flags.extend(["-m", message.as_str()]);
        }
        let mut heads = vec![branch];
        heads.extend(opts.extra_heads.iter().map(String::as_str));

        info!(branch, strategy = %opts.strategy, "merging");
        if let Err(err) = self.repo.merge(ctx, &heads, &flags) {
            return Err(self.merge_failure(ctx, branch, err));
        }

        let after = self.resolve(ctx, "commit", "HEAD")?;
        Ok(MergeReport {
            branch: branch.to_string(),
            strategy: opts.strategy,
            fast_forward: !opts.squash && before != after && after == source,
            before,
            after,
            squashed: opts.squash,
            dry_run: false,
            preflight,
        })
    }

    /// Rebase the checked-out branch onto `onto`.
    ///
    /// # Errors
    /// As [`execute`](Self::execute), with [`Error::RebaseConflict`] on
    /// conflicts, leaving the repository rebasing.
    pub fn rebase(&self, ctx: &Context, onto: &str, opts: &RebaseOptions) -> Result<RebaseReport> {
        require_repo(self.repo)?;
        require_name("upstream", onto)?;
        self.require_idle()?;

        self.resolve(ctx, "ref", onto)?;
        let before = self.resolve(ctx, "commit", "HEAD")?;
        let preflight = ConflictPredictor::new(self.repo).detect_conflicts(ctx, "HEAD", onto)?;
        if preflight.has_conflicts() {
            warn!(
                onto,
                count = preflight.conflicts.len(),
                "rebase may stop on conflicts"
            );
        }

        if opts.dry_run {
            info!(onto, "dry run, not rebasing");
            return Ok(RebaseReport {
                onto: onto.to_string(),
                after: before.clone(),
                before,
                dry_run: true,
                preflight,
            });
        }

        info!(onto, interactive = opts.interactive, "rebasing");
        if let Err(err) = self.repo.rebase(ctx, onto, opts.interactive) {
            return Err(self.rebase_failure(ctx, onto, err));
        }

        let after = self.resolve(ctx, "commit", "HEAD")?;
        Ok(RebaseReport {
            onto: onto.to_string(),
            before,
            after,
            dry_run: false,
            preflight,
        })
    }

    /// Abort the merge or rebase in progress and return what was aborted.
    ///
    /// # Errors
    /// Returns [`Error::NoOperationInProgress`] when idle. Aborting is never
    /// a silent no-op.
    pub fn abort(&self, ctx: &Context) -> Result<MergeState> {
        require_repo(self.repo)?;
        let state = self.state();
        match state {
            MergeState::None => return Err(Error::NoOperationInProgress),
            MergeState::Merging => self.repo.merge_abort(ctx).during("abort", "merge")?,
            MergeState::Rebasing => self.repo.rebase_abort(ctx).during("abort", "rebase")?,
        }
        info!(%state, "aborted");
        Ok(state)
    }

    /// Continue a rebase after the conflicts were resolved and staged.
    ///
    /// # Errors
    /// Returns [`Error::NoOperationInProgress`] when not rebasing and
    /// [`Error::RebaseConflict`] when a later commit conflicts too.
    pub fn continue_rebase(&self, ctx: &Context) -> Result<()> {
        require_repo(self.repo)?;
        if self.state() != MergeState::Rebasing {
            return Err(Error::NoOperationInProgress);
        }
        let onto = self
            .repo
            .rebase_onto()
            .unwrap_or_else(|| "upstream".to_string());
        if let Err(err) = self.repo.rebase_continue(ctx) {
            return Err(self.rebase_failure(ctx, &onto, err));
        }
        info!(onto = %onto, "rebase continued");
        Ok(())
    }

    fn require_idle(&self) -> Result<()> {
        match self.state() {
            MergeState::None => Ok(()),
            busy => Err(Error::OperationInProgress(busy)),
        }
    }

    fn resolve(&self, ctx: &Context, what: &'static str, rev: &str) -> Result<String> {
        self.repo
            .resolve_commit(ctx, rev)
            .during("resolve", rev)?
            .ok_or_else(|| Error::NotFound {
                what,
                name: rev.to_string(),
            })
    }

    fn merge_failure(&self, ctx: &Context, branch: &str, err: sprig_git::Error) -> Error {
        if err.is_cancelled() {
            return Error::Cancelled;
        }
        let paths = match self.unmerged_after(ctx, branch, &err) {
            Ok(paths) => paths,
            Err(query) => return query,
        };
        if self.state() == MergeState::Merging || !paths.is_empty() {
            warn!(branch, count = paths.len(), "merge stopped on conflicts");
            return Error::MergeConflict {
                branch: branch.to_string(),
                paths,
            };
        }
        Error::Operation {
            op: "merge",
            target: branch.to_string(),
            source: err,
        }
    }

    fn rebase_failure(&self, ctx: &Context, onto: &str, err: sprig_git::Error) -> Error {
        if err.is_cancelled() {
            return Error::Cancelled;
        }
        if self.state() == MergeState::Rebasing {
            let paths = match self.unmerged_after(ctx, onto, &err) {
                Ok(paths) => paths,
                Err(query) => return query,
            };
            warn!(onto, count = paths.len(), "rebase stopped on conflicts");
            return Error::RebaseConflict {
                onto: onto.to_string(),
                paths,
            };
        }
        Error::Operation {
            op: "rebase onto",
            target: onto.to_string(),
            source: err,
        }
    }

    /// Unmerged paths left by a failed merge or rebase.
    ///
    /// A failed query is returned in place of the conflict error, with the
    /// original failure logged.
    fn unmerged_after(
        &self,
        ctx: &Context,
        target: &str,
        failure: &sprig_git::Error,
    ) -> Result<Vec<String>> {
        self.repo
            .unmerged_paths(ctx)
            .during("list unmerged paths", target)
            .inspect_err(|query| {
                warn!(rev = target, %failure, %query, "cannot read unmerged paths after failure");
            })
    }
}
