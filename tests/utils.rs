#![allow(dead_code)]

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing_subscriber::fmt::format::FmtSpan;

/// Runs a git command in `dir`, discarding its output.
pub async fn git(dir: &Path, args: &[&str]) -> anyhow::Result<()> {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    anyhow::ensure!(status.success(), "git {} failed", args.join(" "));
    Ok(())
}

/// Creates a git repository in the given directory.
///
/// This initializes the repo and sets basic git config needed for commits.
/// The directory should already exist.
pub async fn create_git_repo(dir: &Path) -> anyhow::Result<()> {
    git(dir, &["init", "--initial-branch=main"]).await?;
    git(dir, &["config", "user.name", "Test User"]).await?;
    git(dir, &["config", "user.email", "test@example.com"]).await?;
    Ok(())
}

/// Writes `files` (creating parent directories) and commits them.
pub async fn commit_files(dir: &Path, message: &str, files: &[(&str, &str)]) -> anyhow::Result<()> {
    for (path, contents) in files {
        write_file(dir, path, contents).await?;
    }
    git(dir, &["add", "--all"]).await?;
    git(dir, &["commit", "-m", message]).await?;
    Ok(())
}

pub async fn write_file(dir: &Path, path: &str, contents: &str) -> anyhow::Result<()> {
    let path = dir.join(path);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(())
}

/// The binary's subscriber, plus span open/close events.
pub fn setup_logging() -> anyhow::Result<()> {
    snapit::logging::setup_logging(FmtSpan::NEW | FmtSpan::CLOSE)
}

pub enum TestDir {
    Temp(tempfile::TempDir),
    Kept(std::path::PathBuf),
}

impl TestDir {
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;

        if std::env::var("DEBUG_TESTS").is_ok() {
            let path = temp_dir.keep();
            eprintln!("Test directory kept at: {}", path.display());
            Ok(TestDir::Kept(path))
        } else {
            Ok(TestDir::Temp(temp_dir))
        }
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            TestDir::Temp(t) => t.path(),
            TestDir::Kept(p) => p.as_path(),
        }
    }
}
