//! `sprig merge` commands - conflict prediction, merge, rebase and recovery.

use anyhow::Result;
use serde::Serialize;
use sprig_core::{
    ConflictPredictor, MergeOptions, MergeOrchestrator, MergeResult, MergeState, RebaseOptions,
};
use sprig_git::GitOps;

use super::utils;
use super::{GlobalOpts, MergeArgs, RebaseArgs};
use crate::output;

/// JSON output for `merge status`.
#[derive(Debug, Serialize)]
struct StatusOutput {
    state: MergeState,
    in_progress: bool,
    unmerged: Vec<String>,
}

/// Run `merge detect`.
pub fn detect(global: &GlobalOpts, source: &str, target: &str, json: bool) -> Result<()> {
    let session = utils::open_session(global)?;
    let result = ConflictPredictor::new(&session.repo)
        .detect_conflicts(&session.ctx, source, target)?;

    if json {
        return utils::print_json(&result);
    }
    print_prediction(&result);
    Ok(())
}

/// Run `merge do`.
pub fn merge(global: &GlobalOpts, args: &MergeArgs) -> Result<()> {
    let session = utils::open_session(global)?;
    let opts = MergeOptions {
        strategy: args
            .strategy
            .unwrap_or(session.config.merge.default_strategy),
        no_ff: args.no_ff,
        squash: args.squash,
        dry_run: args.dry_run,
        message: args.message.clone(),
        extra_heads: args.extra.clone(),
    };

    let orchestrator = MergeOrchestrator::new(&session.repo);
    let report = orchestrator
        .execute(&session.ctx, &args.branch, &opts)
        .map_err(explain)?;

    if args.json {
        return utils::print_json(&report);
    }
    if report.dry_run {
        print_prediction(&report.preflight);
        return Ok(());
    }

    if report.before == report.after && !report.squashed {
        output::info(&format!("Already up to date with '{}'", report.branch));
    } else if report.fast_forward {
        output::success(&format!(
            "Fast-forwarded to '{}' ({})",
            report.branch,
            short(&report.after)
        ));
    } else if report.squashed {
        output::success(&format!(
            "Squashed '{}' into the index - commit to finish",
            report.branch
        ));
    } else {
        output::success(&format!(
            "Merged '{}' with {} ({})",
            report.branch,
            report.strategy,
            short(&report.after)
        ));
    }
    Ok(())
}

/// Run `merge rebase`, including `--abort` and `--continue`.
pub fn rebase(global: &GlobalOpts, args: &RebaseArgs) -> Result<()> {
    if args.abort {
        return abort(global);
    }

    let session = utils::open_session(global)?;
    let orchestrator = MergeOrchestrator::new(&session.repo);

    if args.continue_ {
        orchestrator
            .continue_rebase(&session.ctx)
            .map_err(explain)?;
        output::success("Rebase complete");
        return Ok(());
    }

    let onto = args
        .onto
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("Nothing to rebase onto - pass <ONTO>"))?;
    let opts = RebaseOptions {
        interactive: args.interactive,
        dry_run: args.dry_run,
    };
    let report = orchestrator
        .rebase(&session.ctx, onto, &opts)
        .map_err(explain)?;

    if args.json {
        return utils::print_json(&report);
    }
    if report.dry_run {
        print_prediction(&report.preflight);
    } else if report.before == report.after {
        output::info(&format!("Already based on '{onto}'"));
    } else {
        output::success(&format!("Rebased onto '{onto}' ({})", short(&report.after)));
    }
    Ok(())
}

/// Run `merge abort`.
pub fn abort(global: &GlobalOpts) -> Result<()> {
    let session = utils::open_session(global)?;
    let aborted = MergeOrchestrator::new(&session.repo).abort(&session.ctx)?;
    let what = if aborted == MergeState::Rebasing {
        "rebase"
    } else {
        "merge"
    };
    output::success(&format!("Aborted {what}"));
    Ok(())
}

/// Run `merge status`.
pub fn status(global: &GlobalOpts, json: bool) -> Result<()> {
    let session = utils::open_session(global)?;
    let orchestrator = MergeOrchestrator::new(&session.repo);
    let state = orchestrator.state();
    let unmerged = if state.is_idle() {
        Vec::new()
    } else {
        session.repo.unmerged_paths(&session.ctx)?
    };

    if json {
        return utils::print_json(&StatusOutput {
            state,
            in_progress: !state.is_idle(),
            unmerged,
        });
    }

    output::essential(&output::merge_state(state));
    for path in &unmerged {
        output::detail(&format!("    {path}"));
    }
    Ok(())
}

fn print_prediction(result: &MergeResult) {
    output::info(&format!(
        "{} -> {}: {}",
        result.source,
        result.target,
        output::difficulty(result.difficulty)
    ));
    if result.up_to_date {
        output::detail("    already merged");
    } else if result.can_fast_forward {
        output::detail("    fast-forward possible");
    }
    if !result.has_conflicts() {
        return;
    }

    output::hr();
    for conflict in &result.conflicts {
        output::essential(&format!("{:<13} {}", conflict.conflict_type, conflict.path));
    }
    output::warn(&format!(
        "{} path(s) are likely to conflict",
        result.conflicts.len()
    ));
}

/// Print the unmerged paths for conflict errors before handing the error on.
fn explain(err: sprig_core::Error) -> anyhow::Error {
    if let Some(paths) = err.conflict_paths() {
        output::error(&err.to_string());
        output::conflict_help(paths);
        return anyhow::anyhow!("stopped on conflicts");
    }
    err.into()
}

fn short(revision: &str) -> &str {
    revision.get(..7).unwrap_or(revision)
}
