use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use super::fs::remove_path;
use super::process::run_command;

pub const DEFAULT_OUTPUT_DIR: &str = "reconstructed_git";
const GIT_DIR: &str = ".git";

/// Fresh git work tree that receives the reconstructed objects.
#[derive(Debug, Clone)]
pub struct WorkTree {
    root: PathBuf,
}

impl WorkTree {
    /// Remove `root` if it exists, recreate it and run `git init` inside.
    ///
    /// # Errors
    ///
    /// Fails when `root` contains the current directory, when the directory
    /// cannot be recreated, or when `git init` fails.
    pub fn prepare(root: &Path, git: &str) -> Result<Self> {
        refuse_enclosing_dir(root)?;
        if root.exists() {
            info!(path = %root.display(), "clearing previous output");
            remove_path(root)?;
        }
        fs::create_dir_all(root)
            .with_context(|| format!("failed to create {}", root.display()))?;
        let root = fs::canonicalize(root)
            .with_context(|| format!("failed to resolve {}", root.display()))?;

        let output = run_command(git, &["init"], &[], &root)?;
        if !output.succeeded() {
            bail!(
                "git init failed in {} (exit {}): {}",
                root.display(),
                output.code,
                output.stderr.trim()
            );
        }
        info!(path = %root.display(), "initialized empty git repository");
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn git_dir(&self) -> PathBuf {
        self.root.join(GIT_DIR)
    }
}

fn refuse_enclosing_dir(root: &Path) -> Result<()> {
    let Ok(target) = fs::canonicalize(root) else {
        return Ok(());
    };
    let cwd = env::current_dir().context("failed to read current directory")?;
    let cwd = fs::canonicalize(&cwd).unwrap_or(cwd);
    if cwd.starts_with(&target) {
        bail!(
            "refusing to clear {}: it contains the current directory",
            target.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_to_clear_the_current_directory() {
        let err = WorkTree::prepare(Path::new("."), "git").expect_err("cwd is protected");
        assert!(err.to_string().contains("refusing"), "{err}");
    }

    #[test]
    fn missing_git_fails_after_clearing() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path().join("out");
        fs::create_dir_all(root.join("stale"))?;
        let err = WorkTree::prepare(&root, "regit-no-such-git").expect_err("no git");
        assert!(err.to_string().contains("failed to start"), "{err}");
        assert!(root.exists());
        assert!(!root.join("stale").exists());
        Ok(())
    }

    #[test]
    fn prepare_initializes_repository() -> Result<()> {
        if run_command("git", &["--version"], &[], Path::new(".")).is_err() {
            eprintln!("skipping work tree init test (git not found)");
            return Ok(());
        }
        let temp = tempfile::tempdir()?;
        let root = temp.path().join("out");
        let tree = WorkTree::prepare(&root, "git")?;
        assert!(tree.git_dir().join("objects").is_dir());
        assert!(tree.git_dir().join("HEAD").is_file());
        Ok(())
    }
}
