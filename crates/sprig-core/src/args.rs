//! Argument checks shared by the engines.
//!
//! These run before anything reaches git and never spawn a process.

use sprig_git::GitOps;

use crate::error::{Error, Result};

/// The handle must point at an existing working copy.
pub(crate) fn require_repo<G: GitOps>(repo: &G) -> Result<()> {
    match repo.workdir() {
        Some(dir) if dir.is_dir() => Ok(()),
        Some(dir) => Err(Error::InvalidArgument(format!(
            "working copy {} no longer exists",
            dir.display()
        ))),
        None => Err(Error::InvalidArgument(
            "repository has no working copy".into(),
        )),
    }
}

/// A required name: non-empty, and not something git would read as an option.
pub(crate) fn require_name(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{what} name is required")));
    }
    if name.starts_with('-') {
        return Err(Error::InvalidArgument(format!(
            "{what} '{name}' cannot start with '-'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_mocks::MockGitOps;

    #[test]
    fn test_require_name() {
        assert!(require_name("branch", "main").is_ok());
        assert!(matches!(
            require_name("branch", ""),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            require_name("branch", "  "),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            require_name("ref", "--upload-pack=x"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_require_repo() {
        assert!(require_repo(&MockGitOps::new()).is_ok());

        let bare = MockGitOps::new().bare();
        let err = require_repo(&bare).unwrap_err();
        assert!(err.to_string().contains("no working copy"));

        let gone = MockGitOps::new().with_workdir("/nonexistent/sprig/workdir");
        assert!(matches!(
            require_repo(&gone),
            Err(Error::InvalidArgument(_))
        ));
    }
}
