#![allow(async_fn_in_trait)]

use std::path;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;

// -----------------------------------------------------------------------------
// GitOps trait

/// Operations on the local working tree.
#[cfg_attr(test, automock)]
pub trait GitOps {
    /// Raw `git status --porcelain` output.
    async fn status_porcelain(&self) -> Result<String>;

    /// Current contents of a file, relative to the repository root.
    async fn read_worktree_file(&self, path: &str) -> Result<Vec<u8>>;
}

// -----------------------------------------------------------------------------
// GitClient

/// Git client for a working tree on disk.
pub struct GitClient {
    root: path::PathBuf,
}

impl GitClient {
    /// Client for the repository containing `path`, which may be any
    /// directory inside the working tree.
    pub async fn open(path: &path::Path) -> Result<Self> {
        let output = Command::new("git")
            .current_dir(path)
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            bail!(
                "{} is not inside a git working tree: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr)
            );
        }

        let root = String::from_utf8(output.stdout)?;
        Ok(Self {
            root: path::PathBuf::from(root.trim_end_matches('\n')),
        })
    }

    /// Top-level directory of the working tree. Status paths are relative to it.
    pub fn root(&self) -> &path::Path {
        &self.root
    }
}

impl GitOps for GitClient {
    async fn status_porcelain(&self) -> Result<String> {
        let output = Command::new("git")
            .current_dir(&self.root)
            // Untracked directories are listed file by file
            .args(["status", "--porcelain", "--untracked-files=all"])
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            bail!(
                "git command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        // Don't trim - leading spaces are part of the status code
        Ok(String::from_utf8(output.stdout)?)
    }

    async fn read_worktree_file(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(self.root.join(path))
            .await
            .with_context(|| format!("Failed to read {}", path))
    }
}
