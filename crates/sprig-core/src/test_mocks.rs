//! Mock implementation of `GitOps` for testing the engines.
//!
//! Keeps a tiny in-memory model of a repository (branches, ancestry, diffs,
//! in-progress state) and synthesizes `git branch -vv` text from it, so the
//! registry, manager, predictor and orchestrator run without a git process.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use sprig_git::{
    ChangeKind, Context, GitOps, ListingScope, PathChange, RefDetails, RepoState,
    Result as GitResult,
};

#[derive(Debug, Clone)]
pub struct MockBranch {
    pub name: String,
    pub revision: String,
    pub upstream: Option<(String, u32, u32)>,
    pub merged: bool,
    pub committer_date: i64,
    pub author: String,
}

impl MockBranch {
    fn new(name: &str, revision: &str) -> Self {
        Self {
            name: name.to_string(),
            revision: revision.to_string(),
            upstream: None,
            merged: false,
            committer_date: 0,
            author: "Test User".to_string(),
        }
    }
}

fn failed(command: &str, stderr: &str) -> sprig_git::Error {
    sprig_git::Error::CommandFailed {
        command: format!("git {command}"),
        exit_code: 1,
        stderr: format!("{stderr}\n"),
    }
}

/// Mock implementation of `GitOps` for testing.
pub struct MockGitOps {
    workdir: Option<PathBuf>,
    git_dir: PathBuf,
    pub current: RefCell<Option<String>>,
    pub detached_at: RefCell<Option<String>>,
    pub branches: RefCell<Vec<MockBranch>>,
    pub remotes: RefCell<Vec<MockBranch>>,
    pub commits: RefCell<HashSet<String>>,
    pub ancestry: RefCell<HashSet<(String, String)>>,
    pub bases: RefCell<HashMap<(String, String), String>>,
    pub changes: RefCell<HashMap<(String, String), Vec<PathChange>>>,
    pub state: RefCell<RepoState>,
    pub onto: RefCell<Option<String>>,
    pub unmerged_failure: RefCell<Option<String>>,
    pub unmerged: RefCell<Vec<String>>,
    pub merge_conflicts: RefCell<Option<Vec<String>>>,
    pub rebase_conflicts: RefCell<Option<Vec<String>>>,
    pub listing_failure: RefCell<Option<String>>,
    pub raw_listing: RefCell<Option<String>>,
    pub calls: RefCell<Vec<String>>,
}

impl Default for MockGitOps {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl MockGitOps {
    pub fn new() -> Self {
        let workdir = std::env::temp_dir();
        Self {
            git_dir: workdir.join("sprig-mock.git"),
            workdir: Some(workdir),
            current: RefCell::new(Some("main".to_string())),
            detached_at: RefCell::new(None),
            branches: RefCell::new(Vec::new()),
            remotes: RefCell::new(Vec::new()),
            commits: RefCell::new(HashSet::new()),
            ancestry: RefCell::new(HashSet::new()),
            bases: RefCell::new(HashMap::new()),
            changes: RefCell::new(HashMap::new()),
            state: RefCell::new(RepoState::Clean),
            onto: RefCell::new(None),
            unmerged_failure: RefCell::new(None),
            unmerged: RefCell::new(Vec::new()),
            merge_conflicts: RefCell::new(None),
            rebase_conflicts: RefCell::new(None),
            listing_failure: RefCell::new(None),
            raw_listing: RefCell::new(None),
            calls: RefCell::new(Vec::new()),
        }
    }

    // === Builders ===

    pub fn bare(mut self) -> Self {
        self.workdir = None;
        self
    }

    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn with_git_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.git_dir = dir.into();
        self
    }

    pub fn with_branch(self, name: &str, revision: &str) -> Self {
        self.branches
            .borrow_mut()
            .push(MockBranch::new(name, revision));
        self.commits.borrow_mut().insert(revision.to_string());
        self
    }

    pub fn with_remote_branch(self, name: &str, revision: &str) -> Self {
        self.remotes.borrow_mut().push(MockBranch::new(name, revision));
        self.commits.borrow_mut().insert(revision.to_string());
        self
    }

    pub fn with_merged(self, name: &str) -> Self {
        for branch in self.branches.borrow_mut().iter_mut() {
            if branch.name == name {
                branch.merged = true;
            }
        }
        self
    }

    pub fn with_upstream(self, name: &str, upstream: &str, ahead: u32, behind: u32) -> Self {
        for branch in self.branches.borrow_mut().iter_mut() {
            if branch.name == name {
                branch.upstream = Some((upstream.to_string(), ahead, behind));
            }
        }
        self
    }

    pub fn with_tip(self, name: &str, committer_date: i64, author: &str) -> Self {
        for branch in self
            .branches
            .borrow_mut()
            .iter_mut()
            .chain(self.remotes.borrow_mut().iter_mut())
        {
            if branch.name == name {
                branch.committer_date = committer_date;
                branch.author = author.to_string();
            }
        }
        self
    }

    pub fn with_rebase_onto(self, onto: &str) -> Self {
        *self.onto.borrow_mut() = Some(onto.to_string());
        self
    }

    pub fn with_unmerged_failure(self, stderr: &str) -> Self {
        *self.unmerged_failure.borrow_mut() = Some(stderr.to_string());
        self
    }

    pub fn with_current_branch(self, name: &str) -> Self {
        *self.current.borrow_mut() = Some(name.to_string());
        *self.detached_at.borrow_mut() = None;
        self
    }

    pub fn detached(self) -> Self {
        let revision = self.head_revision().unwrap_or_else(|| "0000000".to_string());
        *self.current.borrow_mut() = None;
        *self.detached_at.borrow_mut() = Some(revision);
        self
    }

    pub fn with_ancestor(self, ancestor: &str, descendant: &str) -> Self {
        self.ancestry
            .borrow_mut()
            .insert((ancestor.to_string(), descendant.to_string()));
        self
    }

    pub fn with_merge_base(self, one: &str, two: &str, base: &str) -> Self {
        self.bases
            .borrow_mut()
            .insert((one.to_string(), two.to_string()), base.to_string());
        self.commits.borrow_mut().insert(base.to_string());
        self
    }

    pub fn with_changes(self, from: &str, to: &str, changes: &[(&str, ChangeKind, bool)]) -> Self {
        let changes = changes
            .iter()
            .map(|(path, kind, binary)| PathChange {
                path: (*path).to_string(),
                kind: *kind,
                binary: *binary,
            })
            .collect();
        self.changes
            .borrow_mut()
            .insert((from.to_string(), to.to_string()), changes);
        self
    }

    pub fn with_state(self, state: RepoState) -> Self {
        *self.state.borrow_mut() = state;
        self
    }

    pub fn with_merge_conflicts(self, paths: &[&str]) -> Self {
        *self.merge_conflicts.borrow_mut() = Some(paths.iter().map(ToString::to_string).collect());
        self
    }

    pub fn with_rebase_conflicts(self, paths: &[&str]) -> Self {
        *self.rebase_conflicts.borrow_mut() = Some(paths.iter().map(ToString::to_string).collect());
        self
    }

    pub fn with_listing_failure(self, stderr: &str) -> Self {
        *self.listing_failure.borrow_mut() = Some(stderr.to_string());
        self
    }

    pub fn with_raw_listing(self, listing: &str) -> Self {
        *self.raw_listing.borrow_mut() = Some(listing.to_string());
        self
    }

    // === Inspection ===

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls that would change the repository.
    pub fn mutations(&self) -> Vec<String> {
        const MUTATING: &[&str] = &[
            "create_branch",
            "checkout",
            "delete_branch",
            "delete_remote_branch",
            "rename_branch",
            "merge",
            "merge_abort",
            "rebase",
            "rebase_abort",
            "rebase_continue",
        ];
        self.calls
            .borrow()
            .iter()
            .filter(|c| MUTATING.iter().any(|m| c.split(' ').next() == Some(*m)))
            .cloned()
            .collect()
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.branches.borrow().iter().any(|b| b.name == name)
    }

    pub fn revision_of(&self, name: &str) -> Option<String> {
        self.branches
            .borrow()
            .iter()
            .chain(self.remotes.borrow().iter())
            .find(|b| b.name == name)
            .map(|b| b.revision.clone())
    }

    fn head_revision(&self) -> Option<String> {
        if let Some(revision) = self.detached_at.borrow().clone() {
            return Some(revision);
        }
        let current = self.current.borrow().clone()?;
        self.revision_of(&current)
    }

    fn record(&self, ctx: &Context, call: String) -> GitResult<()> {
        let cancelled = ctx.is_cancelled();
        self.calls.borrow_mut().push(call.clone());
        if cancelled {
            return Err(sprig_git::Error::Cancelled {
                command: format!("git {call}"),
            });
        }
        Ok(())
    }

    fn resolve(&self, rev: &str) -> Option<String> {
        if rev == "HEAD" {
            return self.head_revision();
        }
        let name = rev
            .strip_prefix("refs/heads/")
            .or_else(|| rev.strip_prefix("refs/remotes/"))
            .unwrap_or(rev);
        self.revision_of(name)
            .or_else(|| self.commits.borrow().contains(rev).then(|| rev.to_string()))
    }

    fn listing_line(branch: &MockBranch, is_head: bool, prefix: &str) -> String {
        let marker = if is_head { '*' } else { ' ' };
        let bracket = match &branch.upstream {
            Some((upstream, 0, 0)) => format!("[{upstream}] "),
            Some((upstream, ahead, 0)) => format!("[{upstream}: ahead {ahead}] "),
            Some((upstream, 0, behind)) => format!("[{upstream}: behind {behind}] "),
            Some((upstream, ahead, behind)) => {
                format!("[{upstream}: ahead {ahead}, behind {behind}] ")
            }
            None => String::new(),
        };
        format!(
            "{marker} {prefix}{} {} {bracket}Commit on {}",
            branch.name, branch.revision, branch.name
        )
    }

    fn set_head_revision(&self, revision: &str) {
        self.commits.borrow_mut().insert(revision.to_string());
        if self.detached_at.borrow().is_some() {
            *self.detached_at.borrow_mut() = Some(revision.to_string());
            return;
        }
        let current = self.current.borrow().clone();
        for branch in self.branches.borrow_mut().iter_mut() {
            if Some(&branch.name) == current.as_ref() {
                branch.revision = revision.to_string();
            }
        }
    }
}

impl GitOps for MockGitOps {
    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn state(&self) -> RepoState {
        *self.state.borrow()
    }

    fn rebase_onto(&self) -> Option<String> {
        self.onto.borrow().clone()
    }

    fn current_branch(&self, ctx: &Context) -> GitResult<Option<String>> {
        self.record(ctx, "current_branch".into())?;
        Ok(self.current.borrow().clone())
    }

    fn branch_listing(&self, ctx: &Context, scope: ListingScope) -> GitResult<String> {
        self.record(
            ctx,
            format!("branch_listing all={} merged={}", scope.all, scope.merged),
        )?;
        if let Some(stderr) = self.listing_failure.borrow().as_deref() {
            return Err(failed("branch -vv", stderr));
        }
        if let Some(raw) = self.raw_listing.borrow().clone() {
            return Ok(raw);
        }

        let current = self.current.borrow().clone();
        let mut lines = Vec::new();
        if let Some(revision) = self.detached_at.borrow().as_deref() {
            lines.push(format!("* (HEAD detached at {revision}) {revision} detached"));
        }
        for branch in self.branches.borrow().iter() {
            let is_head = current.as_deref() == Some(branch.name.as_str());
            if scope.merged && !(is_head || branch.merged) {
                continue;
            }
            lines.push(Self::listing_line(branch, is_head, ""));
        }
        if scope.all {
            for branch in self.remotes.borrow().iter() {
                if scope.merged && !branch.merged {
                    continue;
                }
                lines.push(Self::listing_line(branch, false, "remotes/"));
            }
        }
        lines.push(String::new());
        Ok(lines.join("\n"))
    }

    fn ref_details(&self, ctx: &Context, all: bool) -> GitResult<Vec<RefDetails>> {
        self.record(ctx, format!("ref_details all={all}"))?;
        let details = |branch: &MockBranch, namespace: &str| RefDetails {
            reference: format!("{namespace}{}", branch.name),
            upstream: branch.upstream.as_ref().map(|(u, _, _)| u.clone()),
            committer_date: branch.committer_date,
            author: branch.author.clone(),
        };
        let mut refs: Vec<RefDetails> = self
            .branches
            .borrow()
            .iter()
            .map(|b| details(b, "refs/heads/"))
            .collect();
        if all {
            refs.extend(self.remotes.borrow().iter().map(|b| details(b, "refs/remotes/")));
        }
        Ok(refs)
    }

    fn resolve_commit(&self, ctx: &Context, rev: &str) -> GitResult<Option<String>> {
        self.record(ctx, format!("resolve_commit {rev}"))?;
        Ok(self.resolve(rev))
    }

    fn ref_exists(&self, ctx: &Context, refname: &str) -> GitResult<bool> {
        self.record(ctx, format!("ref_exists {refname}"))?;
        if let Some(name) = refname.strip_prefix("refs/heads/") {
            return Ok(self.has_branch(name));
        }
        if let Some(name) = refname.strip_prefix("refs/remotes/") {
            return Ok(self.remotes.borrow().iter().any(|b| b.name == name));
        }
        Ok(false)
    }

    fn merge_base(&self, ctx: &Context, one: &str, two: &str) -> GitResult<Option<String>> {
        self.record(ctx, format!("merge_base {one} {two}"))?;
        let bases = self.bases.borrow();
        Ok(bases
            .get(&(one.to_string(), two.to_string()))
            .or_else(|| bases.get(&(two.to_string(), one.to_string())))
            .cloned())
    }

    fn is_ancestor(&self, ctx: &Context, ancestor: &str, descendant: &str) -> GitResult<bool> {
        self.record(ctx, format!("is_ancestor {ancestor} {descendant}"))?;
        Ok(ancestor == descendant
            || self
                .ancestry
                .borrow()
                .contains(&(ancestor.to_string(), descendant.to_string())))
    }

    fn changed_paths(&self, ctx: &Context, from: &str, to: &str) -> GitResult<Vec<PathChange>> {
        self.record(ctx, format!("changed_paths {from} {to}"))?;
        Ok(self
            .changes
            .borrow()
            .get(&(from.to_string(), to.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn unmerged_paths(&self, ctx: &Context) -> GitResult<Vec<String>> {
        self.record(ctx, "unmerged_paths".into())?;
        if let Some(stderr) = self.unmerged_failure.borrow().as_deref() {
            return Err(failed("diff --diff-filter=U", stderr));
        }
        Ok(self.unmerged.borrow().clone())
    }

    fn create_branch(
        &self,
        ctx: &Context,
        name: &str,
        start: Option<&str>,
        force: bool,
        track: bool,
    ) -> GitResult<()> {
        self.record(
            ctx,
            format!("create_branch {name} start={start:?} force={force} track={track}"),
        )?;
        if self.has_branch(name) && !force {
            return Err(failed(
                "branch",
                &format!("fatal: a branch named '{name}' already exists"),
            ));
        }
        let revision = match start {
            Some(start) => self.resolve(start),
            None => self.head_revision(),
        }
        .ok_or_else(|| failed("branch", "fatal: not a valid object name"))?;

        let mut branch = MockBranch::new(name, &revision);
        if track {
            let upstream = start
                .map(ToString::to_string)
                .or_else(|| self.current.borrow().clone());
            branch.upstream = upstream.map(|u| (u, 0, 0));
        }
        let mut branches = self.branches.borrow_mut();
        branches.retain(|b| b.name != name);
        branches.push(branch);
        Ok(())
    }

    fn checkout(&self, ctx: &Context, name: &str) -> GitResult<()> {
        self.record(ctx, format!("checkout {name}"))?;
        if !self.has_branch(name) {
            return Err(failed("switch", &format!("fatal: invalid reference: {name}")));
        }
        *self.current.borrow_mut() = Some(name.to_string());
        *self.detached_at.borrow_mut() = None;
        Ok(())
    }

    fn delete_branch(&self, ctx: &Context, name: &str, force: bool) -> GitResult<()> {
        self.record(ctx, format!("delete_branch {name} force={force}"))?;
        let merged = self
            .branches
            .borrow()
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.merged);
        match merged {
            None => Err(failed(
                "branch -d",
                &format!("error: branch '{name}' not found"),
            )),
            Some(false) if !force => Err(failed(
                "branch -d",
                &format!("error: the branch '{name}' is not fully merged"),
            )),
            Some(_) => {
                self.branches.borrow_mut().retain(|b| b.name != name);
                Ok(())
            }
        }
    }

    fn delete_remote_branch(&self, ctx: &Context, remote: &str, name: &str) -> GitResult<()> {
        self.record(ctx, format!("delete_remote_branch {remote} {name}"))?;
        let full = format!("{remote}/{name}");
        self.remotes.borrow_mut().retain(|b| b.name != full);
        Ok(())
    }

    fn rename_branch(&self, ctx: &Context, old: &str, new: &str, force: bool) -> GitResult<()> {
        self.record(ctx, format!("rename_branch {old} {new} force={force}"))?;
        if self.has_branch(new) && !force {
            return Err(failed(
                "branch -m",
                &format!("fatal: a branch named '{new}' already exists"),
            ));
        }
        let mut branches = self.branches.borrow_mut();
        branches.retain(|b| b.name != new);
        for branch in branches.iter_mut() {
            if branch.name == old {
                branch.name = new.to_string();
            }
        }
        drop(branches);
        let mut current = self.current.borrow_mut();
        if current.as_deref() == Some(old) {
            *current = Some(new.to_string());
        }
        Ok(())
    }

    fn merge(&self, ctx: &Context, heads: &[&str], flags: &[&str]) -> GitResult<()> {
        self.record(ctx, format!("merge {} {}", flags.join(" "), heads.join(" ")))?;
        if let Some(paths) = self.merge_conflicts.borrow().clone() {
            if !flags.contains(&"--squash") {
                *self.state.borrow_mut() = RepoState::Merge;
            }
            *self.unmerged.borrow_mut() = paths;
            return Err(failed(
                "merge",
                "Automatic merge failed; fix conflicts and then commit the result.",
            ));
        }
        if flags.contains(&"--squash") {
            return Ok(());
        }

        let head = self.head_revision().unwrap_or_default();
        let source = heads
            .first()
            .and_then(|h| self.resolve(h))
            .unwrap_or_default();
        if head == source {
            return Ok(());
        }
        let fast_forward = heads.len() == 1
            && !flags.contains(&"--no-ff")
            && self.ancestry.borrow().contains(&(head.clone(), source.clone()));
        if fast_forward {
            self.set_head_revision(&source);
        } else if flags.contains(&"--ff-only") {
            return Err(failed("merge", "fatal: Not possible to fast-forward, aborting."));
        } else {
            self.set_head_revision("face0ff");
        }
        Ok(())
    }

    fn merge_abort(&self, ctx: &Context) -> GitResult<()> {
        self.record(ctx, "merge_abort".into())?;
        *self.state.borrow_mut() = RepoState::Clean;
        self.unmerged.borrow_mut().clear();
        Ok(())
    }

    fn rebase(&self, ctx: &Context, onto: &str, interactive: bool) -> GitResult<()> {
        self.record(ctx, format!("rebase {onto} interactive={interactive}"))?;
        if let Some(paths) = self.rebase_conflicts.borrow().clone() {
            *self.state.borrow_mut() = RepoState::RebaseMerge;
            *self.onto.borrow_mut() = self.resolve(onto);
            *self.unmerged.borrow_mut() = paths;
            return Err(failed("rebase", "error: could not apply 1234567... change"));
        }
        self.set_head_revision("5eba5ed");
        Ok(())
    }

    fn rebase_abort(&self, ctx: &Context) -> GitResult<()> {
        self.record(ctx, "rebase_abort".into())?;
        *self.state.borrow_mut() = RepoState::Clean;
        *self.onto.borrow_mut() = None;
        self.unmerged.borrow_mut().clear();
        Ok(())
    }

    fn rebase_continue(&self, ctx: &Context) -> GitResult<()> {
        self.record(ctx, "rebase_continue".into())?;
        if !self.unmerged.borrow().is_empty() {
            return Err(failed("rebase --continue", "error: you must edit all merge conflicts"));
        }
        *self.state.borrow_mut() = RepoState::Clean;
        *self.onto.borrow_mut() = None;
        self.set_head_revision("5eba5ed");
        Ok(())
    }
}
