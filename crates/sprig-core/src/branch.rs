//! Branch records and the `git branch -vv` listing parser.
//!
//! A listing line is read by a small ordered tokenizer:
//! marker, name, revision, optional `[upstream: status]` bracket, and a
//! trailing commit subject that is discarded. Each stage fails on its own,
//! so a malformed line points at the stage that broke.

use serde::Serialize;

use crate::classify::{BranchType, infer_type};
use crate::error::{Error, Result};

const LOCAL_NAMESPACE: &str = "refs/heads/";
const REMOTE_NAMESPACE: &str = "refs/remotes/";
const REMOTE_LISTING_PREFIX: &str = "remotes/";

/// One named ref, as seen in a single listing snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    /// Short name (`feature/x`, or `origin/feature/x` for remote refs).
    pub name: String,
    /// Fully-qualified ref.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Abbreviated tip commit.
    pub revision: String,
    /// The branch checked out in this working copy.
    pub is_head: bool,
    /// A remote-tracking ref rather than a local branch.
    pub is_remote: bool,
    /// Reachable from `HEAD`.
    pub is_merged: bool,
    /// The tracked upstream, if any.
    pub upstream: Option<String>,
    /// Commits on this branch missing from upstream.
    pub ahead_by: u32,
    /// Commits on upstream missing from this branch.
    pub behind_by: u32,
}

impl Branch {
    /// Naming category of this branch.
    ///
    /// Remote refs are classified by the name below the remote.
    #[must_use]
    pub fn branch_type(&self) -> BranchType {
        if self.is_remote {
            self.name
                .split_once('/')
                .map_or(BranchType::Other, |(_, rest)| infer_type(rest))
        } else {
            infer_type(&self.name)
        }
    }

    /// Whether the branch has diverged from its upstream in either direction.
    #[must_use]
    pub const fn is_diverged(&self) -> bool {
        self.ahead_by > 0 || self.behind_by > 0
    }
}

/// A classified listing line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingEntry {
    /// A regular local or remote-tracking branch.
    Branch(Branch),
    /// The `(HEAD detached at ...)` or `(no branch, ...)` pseudo-entry.
    Detached,
    /// A symbolic ref such as `remotes/origin/HEAD -> origin/main`.
    Symbolic {
        /// The symbolic ref's name.
        name: String,
        /// What it points at.
        target: String,
    },
}

/// Splits the line into whitespace-delimited tokens from the left.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    const fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn token(&mut self) -> Option<&'a str> {
        self.skip_whitespace();
        if self.rest.is_empty() {
            return None;
        }
        let end = self
            .rest
            .find(char::is_whitespace)
            .unwrap_or(self.rest.len());
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(token)
    }

    /// Take a `open ... close` group if the next token starts with `open`.
    ///
    /// An unterminated group is left in place.
    fn group(&mut self, open: char, close: char) -> Option<&'a str> {
        self.skip_whitespace();
        let body = self.rest.strip_prefix(open)?;
        let end = body.find(close)?;
        self.rest = &body[end + close.len_utf8()..];
        Some(&body[..end])
    }
}

fn malformed(line: &str) -> Error {
    Error::MalformedLine {
        line: line.to_string(),
    }
}

/// Upstream name and divergence counts from a bracket body.
///
/// Counts that are missing or not numbers are read as 0.
fn parse_tracking(body: &str) -> (String, u32, u32) {
    let (upstream, status) = body.split_once(':').unwrap_or((body, ""));
    let mut ahead = 0;
    let mut behind = 0;
    let count = |word: Option<&str>| -> u32 { word.and_then(|n| n.parse().ok()).unwrap_or(0) };
    for clause in status.split(',') {
        let mut words = clause.split_whitespace();
        match words.next() {
            Some("ahead") => ahead = count(words.next()),
            Some("behind") => behind = count(words.next()),
            _ => {}
        }
    }
    (upstream.trim().to_string(), ahead, behind)
}

/// Classify one listing line.
///
/// # Errors
/// Returns [`Error::MalformedLine`] if the line has no name or no revision.
pub fn parse_entry(line: &str) -> Result<ListingEntry> {
    let mut cursor = Cursor::new(line);

    // marker
    cursor.skip_whitespace();
    let mut is_head = false;
    let mut worktree = false;
    if let Some(rest) = cursor.rest.strip_prefix('*') {
        is_head = true;
        cursor.rest = rest;
    } else if let Some(rest) = cursor.rest.strip_prefix('+') {
        worktree = true;
        cursor.rest = rest;
    }

    // name
    cursor.skip_whitespace();
    if cursor.rest.starts_with('(') {
        return Ok(ListingEntry::Detached);
    }
    let name = cursor.token().ok_or_else(|| malformed(line))?;

    // revision
    let revision = cursor.token().ok_or_else(|| malformed(line))?;
    if revision == "->" {
        let target = cursor.token().ok_or_else(|| malformed(line))?;
        return Ok(ListingEntry::Symbolic {
            name: name.to_string(),
            target: target.to_string(),
        });
    }

    // a branch checked out in another worktree shows that worktree's path
    if worktree {
        cursor.group('(', ')');
    }

    // optional tracking bracket; the subject after it is ignored
    let (upstream, ahead_by, behind_by) = match cursor.group('[', ']') {
        Some(body) => {
            let (upstream, ahead, behind) = parse_tracking(body);
            (Some(upstream).filter(|u| !u.is_empty()), ahead, behind)
        }
        None => (None, 0, 0),
    };

    let (name, reference, is_remote) = match name.strip_prefix(REMOTE_LISTING_PREFIX) {
        Some(remote) => (remote, format!("{REMOTE_NAMESPACE}{remote}"), true),
        None => (name, format!("{LOCAL_NAMESPACE}{name}"), false),
    };

    Ok(ListingEntry::Branch(Branch {
        name: name.to_string(),
        reference,
        revision: revision.to_string(),
        is_head,
        is_remote,
        is_merged: false,
        upstream,
        ahead_by,
        behind_by,
    }))
}

/// Parse one listing line into a [`Branch`].
///
/// # Errors
/// Returns [`Error::MalformedLine`] if the line lacks a name or revision,
/// or describes a detached HEAD or symbolic ref instead of a branch.
pub fn parse_line(line: &str) -> Result<Branch> {
    match parse_entry(line)? {
        ListingEntry::Branch(branch) => Ok(branch),
        ListingEntry::Detached | ListingEntry::Symbolic { .. } => Err(malformed(line)),
    }
}

/// Parse a full listing, keeping git's order.
///
/// Blank lines, the detached HEAD entry and symbolic refs are skipped. A
/// single bad line fails the whole listing.
///
/// # Errors
/// Returns [`Error::MalformedLine`] for an unparseable line, or when more
/// than one line claims to be the checked-out branch.
pub fn parse_listing(listing: &str) -> Result<Vec<Branch>> {
    let mut branches = Vec::new();
    let mut seen_head = false;
    for line in listing.lines().filter(|l| !l.trim().is_empty()) {
        let ListingEntry::Branch(branch) = parse_entry(line)? else {
            continue;
        };
        if branch.is_head {
            if seen_head {
                return Err(malformed(line));
            }
            seen_head = true;
        }
        branches.push(branch);
    }
    Ok(branches)
}
