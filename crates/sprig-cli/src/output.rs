//! Terminal output formatting utilities.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use sprig_core::{Branch, Difficulty, MergeState};

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

/// Set quiet mode globally. Call once at startup.
pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Print a success message (suppressed in quiet mode).
pub fn success(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "✓".green(), msg);
    }
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message (suppressed in quiet mode).
pub fn info(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "→".blue(), msg);
    }
}

/// Print a detail line without prefix (suppressed in quiet mode).
pub fn detail(msg: &str) {
    if !is_quiet() {
        println!("{msg}");
    }
}

/// Print essential machine-readable output (always prints).
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// Print the paths left unmerged and how to get out (always to stderr).
pub fn conflict_help(paths: &[String]) {
    for path in paths {
        eprintln!("    {} {path}", "U".red());
    }
    eprintln!();
    eprintln!("Resolve the conflicts, then:");
    eprintln!("  - for a merge: git add <paths> && git commit");
    eprintln!("  - for a rebase: git add <paths> && sprig merge rebase --continue");
    eprintln!("Or give up with `sprig merge abort`.");
}

/// Get a colored branch name with current indicator.
#[must_use]
pub fn branch_name(name: &str, is_current: bool) -> String {
    if is_current {
        format!("{} {}", "▶".cyan(), name.cyan().bold())
    } else {
        format!("  {name}")
    }
}

/// Upstream and divergence, e.g. `[origin/main ↑1 ↓2]`. Empty without upstream.
#[must_use]
pub fn tracking(branch: &Branch) -> String {
    let Some(upstream) = &branch.upstream else {
        return String::new();
    };
    let mut parts = vec![upstream.clone()];
    if branch.ahead_by > 0 {
        parts.push(format!("↑{}", branch.ahead_by));
    }
    if branch.behind_by > 0 {
        parts.push(format!("↓{}", branch.behind_by));
    }
    let text = format!("[{}]", parts.join(" "));

    if branch.is_diverged() {
        text.yellow().to_string()
    } else {
        text.dimmed().to_string()
    }
}

/// Colored label for a predicted merge difficulty.
#[must_use]
pub fn difficulty(difficulty: Difficulty) -> String {
    let label = format!("{difficulty:?}").to_lowercase();
    match difficulty {
        Difficulty::Trivial | Difficulty::Clean => label.green().to_string(),
        Difficulty::Moderate => label.yellow().to_string(),
        Difficulty::Complex => label.red().to_string(),
    }
}

/// Colored label for the repository's merge state.
#[must_use]
pub fn merge_state(state: MergeState) -> String {
    let label = state.to_string();
    if state.is_idle() {
        label.dimmed().to_string()
    } else {
        label.yellow().bold().to_string()
    }
}

/// Print a horizontal line (suppressed in quiet mode).
pub fn hr() {
    if !is_quiet() {
        println!("{}", "─".repeat(50).dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(upstream: Option<&str>, ahead_by: u32, behind_by: u32) -> Branch {
        Branch {
            name: "feature/x".into(),
            reference: "refs/heads/feature/x".into(),
            revision: "abc1234".into(),
            is_head: false,
            is_remote: false,
            is_merged: false,
            upstream: upstream.map(Into::into),
            ahead_by,
            behind_by,
        }
    }

    #[test]
    fn tracking_shows_counts() {
        colored::control::set_override(true);

        assert_eq!(tracking(&branch(None, 3, 0)), "");
        assert_eq!(
            tracking(&branch(Some("origin/x"), 0, 0)),
            "[origin/x]".dimmed().to_string()
        );
        assert_eq!(
            tracking(&branch(Some("origin/x"), 2, 1)),
            "[origin/x ↑2 ↓1]".yellow().to_string()
        );
        assert_eq!(
            tracking(&branch(Some("origin/x"), 0, 4)),
            "[origin/x ↓4]".yellow().to_string()
        );
    }

    #[test]
    fn difficulty_colors_match_severity() {
        colored::control::set_override(true);

        assert_eq!(difficulty(Difficulty::Clean), "clean".green().to_string());
        assert_eq!(
            difficulty(Difficulty::Moderate),
            "moderate".yellow().to_string()
        );
        assert_eq!(difficulty(Difficulty::Complex), "complex".red().to_string());
    }

    #[test]
    fn branch_name_marks_current() {
        colored::control::set_override(true);

        assert_eq!(branch_name("main", false), "  main");
        assert_eq!(
            branch_name("main", true),
            format!("{} {}", "▶".cyan(), "main".cyan().bold())
        );
    }
}
