//! Branch lifecycle: create, delete, rename and lookups.
//!
//! Argument and naming checks run before git is invoked, so a rejected call
//! has no side effects. Protection is enforced here, not by git.

use serde::Serialize;
use sprig_git::{Context, GitOps};
use tracing::info;

use crate::args::{require_name, require_repo};
use crate::branch::Branch;
use crate::branch_name::validate_name;
use crate::classify::ProtectionPolicy;
use crate::config::Config;
use crate::error::{Error, GitResultExt, Result};
use crate::registry::{BranchRegistry, ListOptions};

/// Options for [`BranchManager::create`]. Every flag defaults to off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Start point; `HEAD` when unset.
    pub base: Option<String>,
    /// Switch to the new branch.
    pub checkout: bool,
    /// Track the start point (or the current branch) as upstream.
    pub track: bool,
    /// Reset an existing branch to the start point.
    pub force: bool,
    /// Check the name against git's ref naming rules first.
    pub validate: bool,
}

/// Options for [`BranchManager::delete`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Delete the branch on the remote instead of the local one.
    pub remote: bool,
    /// Override protection and git's unmerged check.
    pub force: bool,
    /// Run every check, delete nothing.
    pub dry_run: bool,
}

/// What [`BranchManager::delete`] did, or would do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// Branch name, without the remote.
    pub name: String,
    /// The remote it was deleted from, for remote deletes.
    pub remote: Option<String>,
    /// The tip the branch pointed at.
    pub revision: Option<String>,
    pub dry_run: bool,
}

/// Creates, deletes and looks up branches.
pub struct BranchManager<'a, G: GitOps> {
    repo: &'a G,
    policy: ProtectionPolicy,
    default_remote: String,
}

impl<'a, G: GitOps> BranchManager<'a, G> {
    /// A manager with the built-in protection list and `origin` as remote.
    pub fn new(repo: &'a G) -> Self {
        Self {
            repo,
            policy: ProtectionPolicy::default(),
            default_remote: "origin".to_string(),
        }
    }

    /// A manager configured from `config`.
    ///
    /// # Errors
    /// Returns error if the config lists an unsupported protection pattern.
    pub fn from_config(repo: &'a G, config: &Config) -> Result<Self> {
        Ok(Self::new(repo)
            .with_policy(config.protection_policy()?)
            .with_default_remote(&config.general.default_remote))
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ProtectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_default_remote(mut self, remote: impl Into<String>) -> Self {
        self.default_remote = remote.into();
        self
    }

    /// The protection policy in force.
    pub const fn policy(&self) -> &ProtectionPolicy {
        &self.policy
    }

    /// Create branch `name`.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] for an empty name
    /// - [`Error::InvalidName`] when `validate` is set and the name is bad
    /// - [`Error::AlreadyExists`] when the branch exists and `force` is off
    /// - [`Error::NotFound`] when `base` does not resolve
    pub fn create(&self, ctx: &Context, name: &str, opts: &CreateOptions) -> Result<Branch> {
        require_repo(self.repo)?;
        require_name("branch", name)?;
        if let Some(base) = &opts.base {
            require_name("base", base)?;
        }
        if opts.validate {
            validate_name(name)?;
        }

        if !opts.force && self.exists(ctx, name)? {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        if let Some(base) = &opts.base {
            let resolved = self
                .repo
                .resolve_commit(ctx, base)
                .during("resolve", base)?;
            if resolved.is_none() {
                return Err(Error::NotFound {
                    what: "base",
                    name: base.clone(),
                });
            }
        }

        self.repo
            .create_branch(ctx, name, opts.base.as_deref(), opts.force, opts.track)
            .during("create branch", name)?;
        if opts.checkout {
            self.repo.checkout(ctx, name).during("checkout", name)?;
        }
        info!(branch = name, base = ?opts.base, checkout = opts.checkout, "branch created");

        self.get(ctx, name)
    }

    /// Delete branch `name`, locally or on a remote.
    ///
    /// Remote deletes accept `remote/branch` or a bare branch name, which is
    /// looked up on the default remote.
    ///
    /// # Errors
    /// - [`Error::Protected`] for a protected branch without `force`
    /// - [`Error::NotFound`] when the branch does not exist
    /// - [`Error::CurrentBranch`] for the checked-out branch
    pub fn delete(&self, ctx: &Context, name: &str, opts: &DeleteOptions) -> Result<DeleteOutcome> {
        require_repo(self.repo)?;
        require_name("branch", name)?;
        if !opts.force && self.policy.is_protected(name) {
            return Err(Error::Protected(name.to_string()));
        }

        if opts.remote {
            return self.delete_remote(ctx, name, opts);
        }

        let refname = format!("refs/heads/{name}");
        if !self.exists(ctx, name)? {
            return Err(Error::NotFound {
                what: "branch",
                name: name.to_string(),
            });
        }
        let current = self
            .repo
            .current_branch(ctx)
            .during("read HEAD for", name)?;
        if current.as_deref() == Some(name) {
            return Err(Error::CurrentBranch(name.to_string()));
        }

        let revision = self
            .repo
            .resolve_commit(ctx, &refname)
            .during("resolve", &refname)?;
        let outcome = DeleteOutcome {
            name: name.to_string(),
            remote: None,
            revision,
            dry_run: opts.dry_run,
        };
        if opts.dry_run {
            info!(branch = name, "dry run, not deleting");
            return Ok(outcome);
        }

        self.repo
            .delete_branch(ctx, name, opts.force)
            .during("delete branch", name)?;
        info!(branch = name, force = opts.force, "branch deleted");
        Ok(outcome)
    }

    fn delete_remote(
        &self,
        ctx: &Context,
        name: &str,
        opts: &DeleteOptions,
    ) -> Result<DeleteOutcome> {
        let (remote, branch) = self.split_remote(ctx, name)?;
        if !opts.force && self.policy.is_protected(&branch) {
            return Err(Error::Protected(format!("{remote}/{branch}")));
        }

        let refname = format!("refs/remotes/{remote}/{branch}");
        let revision = self
            .repo
            .resolve_commit(ctx, &refname)
            .during("resolve", &refname)?;
        if opts.dry_run {
            info!(branch = %branch, remote = %remote, "dry run, not deleting");
        } else {
            self.repo
                .delete_remote_branch(ctx, &remote, &branch)
                .during("delete remote branch", &branch)?;
            info!(branch = %branch, remote = %remote, "remote branch deleted");
        }
        Ok(DeleteOutcome {
            name: branch,
            remote: Some(remote),
            revision,
            dry_run: opts.dry_run,
        })
    }

    /// Split `name` into remote and branch by asking which remote-tracking
    /// ref exists: `origin/x` as given, else `x` on the default remote.
    fn split_remote(&self, ctx: &Context, name: &str) -> Result<(String, String)> {
        let name = name.strip_prefix("remotes/").unwrap_or(name);
        if let Some((remote, branch)) = name.split_once('/') {
            let exists = self
                .repo
                .ref_exists(ctx, &format!("refs/remotes/{name}"))
                .during("look up", name)?;
            if exists && !branch.is_empty() {
                return Ok((remote.to_string(), branch.to_string()));
            }
        }

        let full = format!("{}/{name}", self.default_remote);
        let exists = self
            .repo
            .ref_exists(ctx, &format!("refs/remotes/{full}"))
            .during("look up", &full)?;
        if exists {
            Ok((self.default_remote.clone(), name.to_string()))
        } else {
            Err(Error::NotFound {
                what: "remote branch",
                name: full,
            })
        }
    }

    /// Rename branch `old` to `new`.
    ///
    /// # Errors
    /// - [`Error::InvalidName`] when `new` breaks the naming rules
    /// - [`Error::Protected`] when `old` is protected and `force` is off
    /// - [`Error::NotFound`] when `old` does not exist
    /// - [`Error::AlreadyExists`] when `new` exists and `force` is off
    pub fn rename(&self, ctx: &Context, old: &str, new: &str, force: bool) -> Result<Branch> {
        require_repo(self.repo)?;
        require_name("branch", old)?;
        require_name("branch", new)?;
        validate_name(new)?;
        if !force && self.policy.is_protected(old) {
            return Err(Error::Protected(old.to_string()));
        }

        if !self.exists(ctx, old)? {
            return Err(Error::NotFound {
                what: "branch",
                name: old.to_string(),
            });
        }
        if !force && self.exists(ctx, new)? {
            return Err(Error::AlreadyExists(new.to_string()));
        }

        self.repo
            .rename_branch(ctx, old, new, force)
            .during("rename branch", old)?;
        info!(from = old, to = new, "branch renamed");
        self.get(ctx, new)
    }

    /// List branches.
    ///
    /// # Errors
    /// See [`BranchRegistry::list`].
    pub fn list(&self, ctx: &Context, opts: &ListOptions) -> Result<Vec<Branch>> {
        BranchRegistry::new(self.repo).list(ctx, opts)
    }

    /// Look up one branch, local first, then remote-tracking.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] when no branch has that name.
    pub fn get(&self, ctx: &Context, name: &str) -> Result<Branch> {
        require_repo(self.repo)?;
        require_name("branch", name)?;
        BranchRegistry::new(self.repo)
            .find(ctx, name)?
            .ok_or_else(|| Error::NotFound {
                what: "branch",
                name: name.to_string(),
            })
    }

    /// The checked-out branch.
    ///
    /// # Errors
    /// Returns [`Error::DetachedHead`] when HEAD is not on a branch.
    pub fn current(&self, ctx: &Context) -> Result<Branch> {
        require_repo(self.repo)?;
        if let Some(branch) = BranchRegistry::new(self.repo).head(ctx)? {
            return Ok(branch);
        }
        match self.repo.current_branch(ctx).during("read", "HEAD")? {
            // on a branch with no commits yet
            Some(name) => Err(Error::NotFound {
                what: "branch",
                name,
            }),
            None => Err(Error::DetachedHead),
        }
    }

    /// Whether local branch `name` exists.
    ///
    /// # Errors
    /// Returns error if git cannot be queried.
    pub fn exists(&self, ctx: &Context, name: &str) -> Result<bool> {
        require_repo(self.repo)?;
        require_name("branch", name)?;
        self.repo
            .ref_exists(ctx, &format!("refs/heads/{name}"))
            .during("look up", name)
    }
}
