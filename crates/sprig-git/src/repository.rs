//! Repository handle backed by the git binary.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::runner::{self, CommandOutput, StdioMode};
use crate::traits::GitOps;
use crate::types::{ChangeKind, ListingScope, PathChange, RefDetails, RepoState};

/// Handle to a git working copy.
///
/// Holds only paths; every query re-runs git, so the handle never goes stale
/// relative to changes made behind its back.
#[derive(Debug, Clone)]
pub struct Repository {
    workdir: Option<PathBuf>,
    git_dir: PathBuf,
    git_binary: OsString,
}

impl Repository {
    /// Open the repository containing `path`, using `git` from `PATH`.
    ///
    /// # Errors
    /// Returns error if no repository found at path or any parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, "git")
    }

    /// Open the repository containing the current directory.
    ///
    /// # Errors
    /// Returns error if not inside a git repository.
    pub fn open_current() -> Result<Self> {
        Self::open(".")
    }

    /// Open the repository containing `path` with a specific git binary.
    ///
    /// # Errors
    /// Returns `NotARepository` if git does not recognise the path.
    pub fn open_with(path: impl AsRef<Path>, git_binary: impl Into<OsString>) -> Result<Self> {
        let path = path.as_ref();
        let git_binary = git_binary.into();
        if !path.is_dir() {
            return Err(Error::NotARepository(path.to_path_buf()));
        }

        let ctx = Context::background();
        let probe = runner::exec(
            &ctx,
            &git_binary,
            path,
            &["rev-parse", "--absolute-git-dir", "--is-bare-repository"],
            StdioMode::Captured,
        )?;
        if !probe.success() {
            return Err(Error::NotARepository(path.to_path_buf()));
        }

        let mut lines = probe.stdout.lines();
        let git_dir = lines
            .next()
            .map(PathBuf::from)
            .ok_or_else(|| Error::NotARepository(path.to_path_buf()))?;
        let bare = lines.next() == Some("true");

        let workdir = if bare {
            None
        } else {
            let toplevel = runner::exec(
                &ctx,
                &git_binary,
                path,
                &["rev-parse", "--show-toplevel"],
                StdioMode::Captured,
            )?;
            toplevel
                .success()
                .then(|| PathBuf::from(toplevel.stdout.trim_end()))
        };

        Ok(Self {
            workdir,
            git_dir,
            git_binary,
        })
    }

    /// The git binary this handle invokes.
    #[must_use]
    pub fn git_binary(&self) -> &OsStr {
        &self.git_binary
    }

    /// Run git with `args`, returning the raw output whatever the exit code.
    ///
    /// # Errors
    /// Returns error on cancellation or if git cannot be started.
    pub fn exec(&self, ctx: &Context, args: &[&str]) -> Result<CommandOutput> {
        runner::exec(ctx, &self.git_binary, self.cwd(), args, StdioMode::Captured)
    }

    /// Run git with `args`, failing on a non-zero exit.
    ///
    /// # Errors
    /// Returns `CommandFailed` with git's stderr on a non-zero exit.
    pub fn run(&self, ctx: &Context, args: &[&str]) -> Result<String> {
        self.exec(ctx, args)?.into_stdout()
    }

    fn run_attached(&self, ctx: &Context, args: &[&str]) -> Result<()> {
        runner::exec(ctx, &self.git_binary, self.cwd(), args, StdioMode::Attached)?
            .into_stdout()
            .map(drop)
    }

    fn cwd(&self) -> &Path {
        self.workdir.as_deref().unwrap_or(&self.git_dir)
    }

    /// Run a query whose exit code 1 means "no", mapping 0/1 to a bool.
    fn exec_predicate(&self, ctx: &Context, args: &[&str]) -> Result<bool> {
        let output = self.exec(ctx, args)?;
        match output.exit_code {
            0 => Ok(true),
            1 => Ok(false),
            _ => output.into_stdout().map(|_| false),
        }
    }
}

impl GitOps for Repository {
    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn state(&self) -> RepoState {
        RepoState::probe(&self.git_dir)
    }

    fn rebase_onto(&self) -> Option<String> {
        RepoState::rebase_onto(&self.git_dir)
    }

    fn current_branch(&self, ctx: &Context) -> Result<Option<String>> {
        let output = self.exec(ctx, &["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        match output.exit_code {
            0 => Ok(Some(output.stdout.trim_end().to_string())),
            1 => Ok(None),
            _ => output.into_stdout().map(|_| None),
        }
    }

    fn branch_listing(&self, ctx: &Context, scope: ListingScope) -> Result<String> {
        let mut args = vec!["branch", "-vv", "--no-color"];
        if scope.all {
            args.push("--all");
        }
        if scope.merged {
            args.push("--merged");
        }
        self.run(ctx, &args)
    }

    fn ref_details(&self, ctx: &Context, all: bool) -> Result<Vec<RefDetails>> {
        let mut args = vec![
            "for-each-ref",
            "--format=%(refname)%00%(upstream:short)%00%(committerdate:unix)%00%(authorname)",
            "refs/heads",
        ];
        if all {
            args.push("refs/remotes");
        }
        let out = self.run(ctx, &args)?;
        Ok(parse_ref_details(&out))
    }

    fn resolve_commit(&self, ctx: &Context, rev: &str) -> Result<Option<String>> {
        let spec = format!("{rev}^{{commit}}");
        let output = self.exec(ctx, &["rev-parse", "--verify", "--quiet", &spec])?;
        if output.success() {
            Ok(Some(output.stdout.trim_end().to_string()))
        } else {
            Ok(None)
        }
    }

    fn ref_exists(&self, ctx: &Context, refname: &str) -> Result<bool> {
        self.exec_predicate(ctx, &["show-ref", "--verify", "--quiet", refname])
    }

    fn merge_base(&self, ctx: &Context, one: &str, two: &str) -> Result<Option<String>> {
        let output = self.exec(ctx, &["merge-base", one, two])?;
        match output.exit_code {
            0 => Ok(Some(output.stdout.trim_end().to_string())),
            1 => Ok(None),
            _ => output.into_stdout().map(|_| None),
        }
    }

    fn is_ancestor(&self, ctx: &Context, ancestor: &str, descendant: &str) -> Result<bool> {
        self.exec_predicate(ctx, &["merge-base", "--is-ancestor", ancestor, descendant])
    }

    fn changed_paths(&self, ctx: &Context, from: &str, to: &str) -> Result<Vec<PathChange>> {
        let status = self.run(
            ctx,
            &["diff", "--name-status", "-z", "--no-renames", from, to],
        )?;
        let numstat = self.run(ctx, &["diff", "--numstat", "-z", "--no-renames", from, to])?;
        Ok(combine_changes(&status, &numstat))
    }

    fn unmerged_paths(&self, ctx: &Context) -> Result<Vec<String>> {
        let out = self.run(ctx, &["diff", "--name-only", "--diff-filter=U", "-z"])?;
        let mut paths: Vec<String> = out
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();
        paths.dedup();
        Ok(paths)
    }

    fn create_branch(
        &self,
        ctx: &Context,
        name: &str,
        start: Option<&str>,
        force: bool,
        track: bool,
    ) -> Result<()> {
        let mut args = vec!["branch"];
        if force {
            args.push("--force");
        }
        if track {
            args.push("--track");
        }
        args.push(name);
        if let Some(start) = start {
            args.push(start);
        }
        self.run(ctx, &args)?;
        info!(branch = name, "created branch");
        Ok(())
    }

    fn checkout(&self, ctx: &Context, name: &str) -> Result<()> {
        self.run(ctx, &["switch", name])?;
        Ok(())
    }

    fn delete_branch(&self, ctx: &Context, name: &str, force: bool) -> Result<()> {
        let flag = if force { "-D" } else { "-d" };
        self.run(ctx, &["branch", flag, name])?;
        info!(branch = name, force, "deleted branch");
        Ok(())
    }

    fn delete_remote_branch(&self, ctx: &Context, remote: &str, name: &str) -> Result<()> {
        self.run(ctx, &["push", remote, "--delete", name])?;
        info!(remote, branch = name, "deleted remote branch");
        Ok(())
    }

    fn rename_branch(&self, ctx: &Context, old: &str, new: &str, force: bool) -> Result<()> {
        let flag = if force { "-M" } else { "-m" };
        self.run(ctx, &["branch", flag, old, new])?;
        info!(from = old, to = new, "renamed branch");
        Ok(())
    }

    fn merge(&self, ctx: &Context, heads: &[&str], flags: &[&str]) -> Result<()> {
        let mut args = vec!["merge", "--no-edit"];
        args.extend_from_slice(flags);
        args.extend_from_slice(heads);
        self.run(ctx, &args)?;
        Ok(())
    }

    fn merge_abort(&self, ctx: &Context) -> Result<()> {
        self.run(ctx, &["merge", "--abort"])?;
        Ok(())
    }

    fn rebase(&self, ctx: &Context, onto: &str, interactive: bool) -> Result<()> {
        if interactive {
            self.run_attached(ctx, &["rebase", "--interactive", onto])
        } else {
            self.run(ctx, &["rebase", onto]).map(drop)
        }
    }

    fn rebase_abort(&self, ctx: &Context) -> Result<()> {
        self.run(ctx, &["rebase", "--abort"])?;
        Ok(())
    }

    fn rebase_continue(&self, ctx: &Context) -> Result<()> {
        self.run(ctx, &["rebase", "--continue"])?;
        Ok(())
    }
}

/// Parse NUL-separated `for-each-ref` records, one ref per line.
fn parse_ref_details(out: &str) -> Vec<RefDetails> {
    out.lines()
        .filter_map(|line| {
            let mut fields = line.splitn(4, '\0');
            let reference = fields.next().filter(|r| !r.is_empty())?;
            let upstream = fields.next().filter(|u| !u.is_empty());
            let committer_date = fields.next().and_then(|d| d.parse().ok()).unwrap_or(0);
            Some(RefDetails {
                reference: reference.to_string(),
                upstream: upstream.map(String::from),
                committer_date,
                author: fields.next().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Join `--name-status -z` and `--numstat -z` output into path changes.
fn combine_changes(name_status: &str, numstat: &str) -> Vec<PathChange> {
    let binary: HashSet<&str> = numstat
        .split('\0')
        .filter_map(|record| {
            let mut fields = record.splitn(3, '\t');
            let added = fields.next()?;
            let deleted = fields.next()?;
            let path = fields.next()?;
            (added == "-" && deleted == "-").then_some(path)
        })
        .collect();

    let mut tokens = name_status.split('\0').filter(|t| !t.is_empty());
    let mut changes = Vec::new();
    while let (Some(status), Some(path)) = (tokens.next(), tokens.next()) {
        changes.push(PathChange {
            path: path.to_string(),
            kind: ChangeKind::from_status(status),
            binary: binary.contains(path),
        });
    }
    changes.sort_by(|a, b| a.path.cmp(&b.path));
    changes
}
