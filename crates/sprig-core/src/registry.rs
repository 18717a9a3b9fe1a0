//! Branch registry: listing snapshots built from git on every call.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sprig_git::{Context, GitOps, ListingScope, RefDetails};
use tracing::debug;

use crate::args::{require_name, require_repo};
use crate::branch::{Branch, parse_listing};
use crate::error::{Error, GitResultExt, Result};

/// Ordering of a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Keep git's order.
    #[default]
    Listing,
    /// Sort by branch name.
    Name,
    /// Most recently committed tip first.
    Date,
    /// Sort by the tip commit's author, then by name.
    Author,
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "listing" => Ok(Self::Listing),
            "name" => Ok(Self::Name),
            "date" => Ok(Self::Date),
            "author" => Ok(Self::Author),
            other => Err(Error::InvalidArgument(format!(
                "unknown sort order '{other}' (expected listing, name, date or author)"
            ))),
        }
    }
}

/// Filter and shape of a branch listing. Defaults list every local branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Include remote-tracking branches.
    pub all: bool,
    /// Only branches merged into `HEAD`.
    pub merged: bool,
    /// Keep at most this many entries, after sorting.
    pub limit: Option<usize>,
    /// Ordering.
    pub sort: SortBy,
}

/// Read-only view of a repository's branches.
pub struct BranchRegistry<'a, G: GitOps> {
    repo: &'a G,
}

impl<'a, G: GitOps> BranchRegistry<'a, G> {
    /// Create a registry over `repo`.
    pub const fn new(repo: &'a G) -> Self {
        Self { repo }
    }

    /// List branches.
    ///
    /// # Errors
    /// Returns [`Error::Operation`] if git fails and [`Error::MalformedLine`]
    /// if any listing line cannot be parsed.
    pub fn list(&self, ctx: &Context, opts: &ListOptions) -> Result<Vec<Branch>> {
        require_repo(self.repo)?;

        let scope = ListingScope {
            all: opts.all,
            merged: opts.merged,
        };
        let mut branches = self.snapshot(ctx, scope)?;
        let details = self.details(ctx, opts.all)?;
        reconcile_upstreams(&mut branches, &details);

        if opts.merged {
            for branch in &mut branches {
                branch.is_merged = true;
            }
        } else {
            let merged: HashSet<String> = self
                .snapshot(
                    ctx,
                    ListingScope {
                        all: opts.all,
                        merged: true,
                    },
                )?
                .into_iter()
                .map(|b| b.reference)
                .collect();
            for branch in &mut branches {
                branch.is_merged = merged.contains(&branch.reference);
            }
        }

        sort_branches(&mut branches, opts.sort, &details);
        if let Some(limit) = opts.limit {
            branches.truncate(limit);
        }

        debug!(count = branches.len(), all = opts.all, "listed branches");
        Ok(branches)
    }

    /// Find a branch by name, local branches first, then remote-tracking ones.
    ///
    /// # Errors
    /// Returns error if the listing fails.
    pub fn find(&self, ctx: &Context, name: &str) -> Result<Option<Branch>> {
        require_name("branch", name)?;
        let name = name.strip_prefix("remotes/").unwrap_or(name);
        let branches = self.list(
            ctx,
            &ListOptions {
                all: true,
                ..ListOptions::default()
            },
        )?;

        let (local, remote): (Vec<Branch>, Vec<Branch>) =
            branches.into_iter().partition(|b| !b.is_remote);
        Ok(local.into_iter().chain(remote).find(|b| b.name == name))
    }

    /// The checked-out branch, `None` when HEAD is detached.
    ///
    /// # Errors
    /// Returns error if the listing fails.
    pub fn head(&self, ctx: &Context) -> Result<Option<Branch>> {
        Ok(self
            .list(ctx, &ListOptions::default())?
            .into_iter()
            .find(|b| b.is_head))
    }

    fn snapshot(&self, ctx: &Context, scope: ListingScope) -> Result<Vec<Branch>> {
        let target = if scope.all { "all" } else { "local" };
        let listing = self
            .repo
            .branch_listing(ctx, scope)
            .during("list branches", target)?;
        parse_listing(&listing)
    }

    fn details(&self, ctx: &Context, all: bool) -> Result<HashMap<String, RefDetails>> {
        let target = if all { "all" } else { "local" };
        Ok(self
            .repo
            .ref_details(ctx, all)
            .during("read ref details", target)?
            .into_iter()
            .map(|d| (d.reference.clone(), d))
            .collect())
    }
}

/// Drop upstreams git does not actually track.
///
/// The listing grammar cannot tell a tracking bracket from a commit subject
/// that starts with `[`, so the parsed upstream is checked against
/// `for-each-ref`.
fn reconcile_upstreams(branches: &mut [Branch], details: &HashMap<String, RefDetails>) {
    for branch in branches {
        let Some(detail) = details.get(&branch.reference) else {
            continue;
        };
        if detail.upstream.is_none() && branch.upstream.is_some() {
            debug!(branch = %branch.name, "ignoring bracket that is not a tracked upstream");
            branch.upstream = None;
            branch.ahead_by = 0;
            branch.behind_by = 0;
        }
    }
}

fn sort_branches(branches: &mut [Branch], sort: SortBy, details: &HashMap<String, RefDetails>) {
    let detail = |b: &Branch| details.get(&b.reference);
    match sort {
        SortBy::Listing => {}
        SortBy::Name => branches.sort_by(|a, b| a.name.cmp(&b.name)),
        SortBy::Date => branches.sort_by(|a, b| {
            let date = |x: &Branch| detail(x).map_or(i64::MIN, |d| d.committer_date);
            date(b).cmp(&date(a)).then_with(|| a.name.cmp(&b.name))
        }),
        SortBy::Author => branches.sort_by(|a, b| {
            let author = |x: &Branch| detail(x).map(|d| d.author.as_str());
            author(a).cmp(&author(b)).then_with(|| a.name.cmp(&b.name))
        }),
    }
}

/// List branches in `repo`.
///
/// # Errors
/// See [`BranchRegistry::list`].
pub fn list_branches<G: GitOps>(
    ctx: &Context,
    repo: &G,
    opts: &ListOptions,
) -> Result<Vec<Branch>> {
    BranchRegistry::new(repo).list(ctx, opts)
}
