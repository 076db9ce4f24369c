use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;

use crate::classify::DEFAULT_VERSION_FILE_PATTERNS;
use crate::classify::PathFilter;
use crate::clients::github_curl::DEFAULT_API_URL;
use crate::compose::DEFAULT_BLOB_CONCURRENCY;
use crate::compose::RetryPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: Option<String>,
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    /// Regular expressions selecting the paths that go into a snapshot commit.
    pub version_file_patterns: Vec<String>,
    pub blob_concurrency: usize,
    pub blob_retries: u32,
    /// Branch the release PR targets.
    pub base_branch: String,
}

impl Config {
    /// Load config from the environment and the workspace's git config.
    ///
    /// The environment takes precedence, so the same workspace works both on a
    /// CI runner and locally.
    pub fn load(path: &Path) -> Result<Self> {
        let github_token = match env_var("GITHUB_TOKEN") {
            Some(token) => Some(token),
            None => git_config(path, "snapit.githubToken")?,
        };

        let (owner, repo) = match env_var("GITHUB_REPOSITORY") {
            Some(slug) => parse_repository(&slug)?,
            None => {
                let url = git_config(path, "remote.origin.url")?
                    .context("No git remote 'origin' configured and GITHUB_REPOSITORY not set")?;
                parse_github_remote(&url)?
            }
        };

        let patterns = git_config_all(path, "snapit.pattern")?;
        let version_file_patterns = if patterns.is_empty() {
            default_patterns()
        } else {
            patterns
        };

        let blob_concurrency = match git_config(path, "snapit.blobConcurrency")? {
            Some(value) => value
                .parse()
                .with_context(|| format!("Invalid snapit.blobConcurrency: {}", value))?,
            None => DEFAULT_BLOB_CONCURRENCY,
        };

        let blob_retries = match git_config(path, "snapit.blobRetries")? {
            Some(value) => value
                .parse()
                .with_context(|| format!("Invalid snapit.blobRetries: {}", value))?,
            None => RetryPolicy::default().attempts,
        };

        Ok(Self {
            github_token,
            api_url: env_var("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            owner,
            repo,
            version_file_patterns,
            blob_concurrency,
            blob_retries,
            base_branch: git_config(path, "snapit.baseBranch")?.unwrap_or_else(|| "main".to_string()),
        })
    }

    pub fn path_filter(&self) -> Result<PathFilter> {
        PathFilter::new(&self.version_file_patterns).context("Invalid version file pattern")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.blob_retries,
            ..RetryPolicy::default()
        }
    }

    /// Default config for tests
    pub fn default_for_tests() -> Self {
        Self {
            github_token: None,
            api_url: DEFAULT_API_URL.to_string(),
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            version_file_patterns: default_patterns(),
            blob_concurrency: 2,
            blob_retries: 1,
            base_branch: "main".to_string(),
        }
    }
}

fn default_patterns() -> Vec<String> {
    DEFAULT_VERSION_FILE_PATTERNS
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Single value of a git config key, `None` if unset.
fn git_config(path: &Path, key: &str) -> Result<Option<String>> {
    Ok(git_config_all(path, key)?.pop())
}

fn git_config_all(path: &Path, key: &str) -> Result<Vec<String>> {
    let output = std::process::Command::new("git")
        .current_dir(path)
        .args(["config", "--get-all", key])
        .output()
        .context("Failed to execute git command")?;

    // Exit code 1 means the key is not set
    if output.status.code() == Some(1) {
        return Ok(vec![]);
    }
    if !output.status.success() {
        bail!(
            "git config --get-all {} failed: {}",
            key,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(String::from_utf8(output.stdout)?
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

/// Split an `owner/repo` slug.
pub fn parse_repository(slug: &str) -> Result<(String, String)> {
    match slug.trim().split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => bail!("Invalid repository '{}', expected owner/repo", slug),
    }
}

/// Owner and repo from a GitHub remote URL.
pub fn parse_github_remote(url: &str) -> Result<(String, String)> {
    // Parse URLs like:
    // git@github.com:owner/repo.git
    // https://github.com/owner/repo.git
    // ssh://git@github.com/owner/repo
    let url = url.trim();
    let parts = ["git@github.com:", "https://github.com/", "ssh://git@github.com/"]
        .iter()
        .find_map(|prefix| url.strip_prefix(prefix))
        .with_context(|| format!("Remote URL is not a GitHub URL: {}", url))?;

    let parts = parts.strip_suffix('/').unwrap_or(parts);
    let parts = parts.strip_suffix(".git").unwrap_or(parts);
    parse_repository(parts)
}
