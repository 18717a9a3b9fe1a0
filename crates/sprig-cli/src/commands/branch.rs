//! `sprig branch` commands - list, inspect, create, delete and rename branches.

use anyhow::{Context as _, Result};
use inquire::Confirm;
use serde::Serialize;
use sprig_core::{
    Branch, BranchManager, BranchType, CreateOptions, DeleteOptions, ListOptions, ProtectionPolicy,
};

use super::utils::{self, Session};
use super::{CreateArgs, DeleteArgs, GlobalOpts, ListArgs};
use crate::output;

/// A branch as printed by `--json`, with its derived classification.
#[derive(Debug, Serialize)]
struct BranchInfo<'a> {
    #[serde(flatten)]
    branch: &'a Branch,
    branch_type: BranchType,
    protected: bool,
}

impl<'a> BranchInfo<'a> {
    fn new(branch: &'a Branch, policy: &ProtectionPolicy) -> Self {
        Self {
            branch,
            branch_type: branch.branch_type(),
            protected: policy.is_protected(&branch.name),
        }
    }
}

fn manager(session: &Session) -> Result<BranchManager<'_, sprig_git::Repository>> {
    Ok(BranchManager::from_config(&session.repo, &session.config)?)
}

/// Run `branch list`.
pub fn list(global: &GlobalOpts, args: &ListArgs) -> Result<()> {
    let session = utils::open_session(global)?;
    let manager = manager(&session)?;
    let opts = ListOptions {
        all: args.all,
        merged: args.merged,
        limit: args.limit,
        sort: args.sort,
    };
    let branches = manager.list(&session.ctx, &opts)?;

    if args.json {
        let infos: Vec<_> = branches
            .iter()
            .map(|b| BranchInfo::new(b, manager.policy()))
            .collect();
        return utils::print_json(&infos);
    }

    if branches.is_empty() {
        output::info("No branches yet");
        return Ok(());
    }
    for branch in &branches {
        print_row(branch, manager.policy());
    }
    Ok(())
}

/// Run `branch show`.
pub fn show(global: &GlobalOpts, name: &str, json: bool) -> Result<()> {
    let session = utils::open_session(global)?;
    let manager = manager(&session)?;
    let branch = manager.get(&session.ctx, name)?;
    print_branch(&branch, manager.policy(), json)
}

/// Run `branch current`.
pub fn current(global: &GlobalOpts, json: bool) -> Result<()> {
    let session = utils::open_session(global)?;
    let manager = manager(&session)?;
    let branch = manager.current(&session.ctx)?;
    if json {
        return print_branch(&branch, manager.policy(), true);
    }
    output::essential(&branch.name);
    Ok(())
}

/// Run `branch create`.
pub fn create(global: &GlobalOpts, args: &CreateArgs) -> Result<()> {
    let session = utils::open_session(global)?;
    let manager = manager(&session)?;
    let opts = CreateOptions {
        base: args.base.clone(),
        checkout: args.checkout,
        track: args.track,
        force: args.force,
        validate: session.config.branch.validate_names && !args.no_validate,
    };
    let branch = manager.create(&session.ctx, &args.name, &opts)?;

    if args.json {
        return utils::print_json(&BranchInfo::new(&branch, manager.policy()));
    }
    let from = args.base.as_deref().unwrap_or("HEAD");
    output::success(&format!("Created branch '{}' from {from}", branch.name));
    if args.checkout {
        output::info(&format!("Switched to '{}'", branch.name));
    }
    Ok(())
}

/// Run `branch delete`.
pub fn delete(global: &GlobalOpts, args: &DeleteArgs) -> Result<()> {
    let session = utils::open_session(global)?;
    let manager = manager(&session)?;

    let policy = manager.policy();
    let protected = policy.is_protected(&args.name)
        || (args.remote
            && args
                .name
                .split_once('/')
                .is_some_and(|(_, branch)| policy.is_protected(branch)));
    if protected && args.force && !args.dry_run && !args.yes && !confirm_protected(&args.name)? {
        output::info("Delete cancelled");
        return Ok(());
    }

    let opts = DeleteOptions {
        remote: args.remote,
        force: args.force,
        dry_run: args.dry_run,
    };
    let outcome = manager.delete(&session.ctx, &args.name, &opts)?;

    if args.json {
        return utils::print_json(&outcome);
    }
    let target = outcome.remote.as_ref().map_or_else(
        || outcome.name.clone(),
        |remote| format!("{remote}/{}", outcome.name),
    );
    let revision = outcome
        .revision
        .as_deref()
        .map(|rev| format!(" (was {rev})"))
        .unwrap_or_default();
    if outcome.dry_run {
        output::info(&format!("Would delete '{target}'{revision}"));
    } else {
        output::success(&format!("Deleted '{target}'{revision}"));
    }
    Ok(())
}

/// Run `branch rename`.
pub fn rename(global: &GlobalOpts, old: &str, new: &str, force: bool) -> Result<()> {
    let session = utils::open_session(global)?;
    let manager = manager(&session)?;
    let branch = manager.rename(&session.ctx, old, new, force)?;
    output::success(&format!("Renamed '{old}' to '{}'", branch.name));
    Ok(())
}

fn confirm_protected(name: &str) -> Result<bool> {
    output::warn(&format!("'{name}' is a protected branch"));
    Confirm::new(&format!("Delete '{name}' anyway?"))
        .with_default(false)
        .prompt()
        .context("Confirmation cancelled")
}

fn print_branch(branch: &Branch, policy: &ProtectionPolicy, json: bool) -> Result<()> {
    if json {
        return utils::print_json(&BranchInfo::new(branch, policy));
    }
    print_row(branch, policy);
    output::detail(&format!("    ref:      {}", branch.reference));
    output::detail(&format!("    type:     {}", branch.branch_type()));
    output::detail(&format!(
        "    merged:   {}",
        if branch.is_merged { "yes" } else { "no" }
    ));
    Ok(())
}

fn print_row(branch: &Branch, policy: &ProtectionPolicy) {
    let mut line = format!(
        "{} {}",
        output::branch_name(&branch.name, branch.is_head),
        branch.revision
    );
    let tracking = output::tracking(branch);
    if !tracking.is_empty() {
        line.push(' ');
        line.push_str(&tracking);
    }
    if policy.is_protected(&branch.name) {
        line.push_str(" (protected)");
    }
    output::essential(&line);
}
