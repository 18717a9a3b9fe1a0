use std::path::Path;
use std::time::Duration;

use anyhow::{Context as _, Result};
use serde::Serialize;
use sprig_core::{Config, Context};
use sprig_git::{GitOps, Repository};

use super::GlobalOpts;

/// An opened repository with its config and the context for this run.
pub struct Session {
    pub repo: Repository,
    pub config: Config,
    pub ctx: Context,
}

/// Open the repository, load its config and build the invocation context.
///
/// `--timeout` overrides `general.timeout_secs`.
pub fn open_session(global: &GlobalOpts) -> Result<Session> {
    let path = global.directory.as_deref().unwrap_or_else(|| Path::new("."));
    let repo = Repository::open(path).context("Not inside a git repository")?;

    let config_path = Config::path_for(repo.git_dir());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let ctx = match global.timeout {
        Some(0) => Context::background(),
        Some(secs) => Context::with_timeout(Duration::from_secs(secs)),
        None => config.context(),
    };

    Ok(Session { repo, config, ctx })
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
