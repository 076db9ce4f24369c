#![allow(async_fn_in_trait)]

use anyhow::Context;
use anyhow::Result;
use log::debug;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;
use tracing::instrument;

use super::github_curl::ApiError;
use super::github_curl::GithubCurlClient;
use crate::objects::BlobId;
use crate::objects::CommitId;
use crate::objects::TreeEntry;
use crate::objects::TreeId;

// -----------------------------------------------------------------------------
// Traits

/// The remote object store: GitHub's git data API.
///
/// Branch names are given without the `refs/heads/` prefix.
#[cfg_attr(test, automock)]
pub trait ObjectStoreOps {
    /// Commit a branch points at. Fails with [`ApiError::NotFound`] when the
    /// branch does not exist.
    async fn get_ref(&self, branch: &str) -> Result<CommitId, ApiError>;
    async fn create_ref(&self, branch: &str, commit: &CommitId) -> Result<(), ApiError>;
    async fn delete_ref(&self, branch: &str) -> Result<(), ApiError>;
    /// Force-move an existing branch to `commit`, fast-forward or not.
    async fn update_ref(&self, branch: &str, commit: &CommitId) -> Result<(), ApiError>;
    /// Tree of a commit.
    async fn get_commit_tree(&self, commit: &CommitId) -> Result<TreeId, ApiError>;
    async fn create_blob(&self, content: &str) -> Result<BlobId, ApiError>;
    /// Write a tree computed from `base_tree` with `entries` applied.
    async fn create_tree(&self, base_tree: &TreeId, entries: &[TreeEntry])
    -> Result<TreeId, ApiError>;
    async fn create_commit(
        &self,
        message: &str,
        tree: &TreeId,
        parents: &[CommitId],
    ) -> Result<CommitId, ApiError>;
}

/// Pull request and issue operations used by the release drivers.
#[cfg_attr(test, automock)]
pub trait PullRequestOps {
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest>;

    /// Open PR from `head_branch` into `base_branch`, if any
    async fn find_open_pull_request(
        &self,
        head_branch: &str,
        base_branch: &str,
    ) -> Result<Option<PullRequest>>;

    async fn create_pull_request(
        &self,
        head_branch: &str,
        base_branch: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest>;

    async fn update_pull_request(&self, number: u64, title: &str, body: &str)
    -> Result<PullRequest>;

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()>;

    async fn create_comment(&self, number: u64, body: &str) -> Result<()>;
}

// -----------------------------------------------------------------------------
// Types

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
    pub head_branch: String,
    pub head_sha: CommitId,
}

/// Client to interact with GitHub API.
#[derive(Clone)]
pub struct GithubClient {
    owner: String,
    repo: String,
    http_client: GithubCurlClient,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitCommit {
    tree: GitObject,
}

#[derive(Debug, Serialize)]
struct CreateRef<'a> {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateRef<'a> {
    sha: &'a str,
    force: bool,
}

#[derive(Debug, Serialize)]
struct CreateBlob<'a> {
    content: &'a str,
    encoding: &'static str,
}

#[derive(Debug, Serialize)]
struct CreateTree<'a> {
    base_tree: &'a str,
    tree: &'a [TreeEntry],
}

#[derive(Debug, Serialize)]
struct CreateCommit<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    number: u64,
    html_url: String,
    head: PullRequestHead,
}

#[derive(Debug, Deserialize)]
struct PullRequestHead {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: String,
}

impl From<PullRequestResponse> for PullRequest {
    fn from(pr: PullRequestResponse) -> Self {
        Self {
            number: pr.number,
            html_url: pr.html_url,
            head_branch: pr.head.ref_name,
            head_sha: CommitId(pr.head.sha),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreatePullRequest<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdatePullRequest<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct AddLabels<'a> {
    labels: &'a [String],
}

#[derive(Debug, Serialize)]
struct CreateComment<'a> {
    body: &'a str,
}

// -----------------------------------------------------------------------------
// GithubClient impl

impl GithubClient {
    pub fn new(token: Option<String>, api_url: String, owner: String, repo: String) -> Self {
        Self {
            owner,
            repo,
            http_client: GithubCurlClient::new(token, api_url),
        }
    }

    fn repo_path(&self, rest: &str) -> String {
        format!("/repos/{}/{}{}", self.owner, self.repo, rest)
    }
}

impl ObjectStoreOps for GithubClient {
    #[instrument(skip_all, fields(branch = branch))]
    async fn get_ref(&self, branch: &str) -> Result<CommitId, ApiError> {
        let path = self.repo_path(&format!("/git/ref/heads/{}", branch));
        let response = self.http_client.get(&path).await?;
        let git_ref: GitRef = serde_json::from_str(&response)?;
        Ok(CommitId(git_ref.object.sha))
    }

    #[instrument(skip_all, fields(branch = branch))]
    async fn create_ref(&self, branch: &str, commit: &CommitId) -> Result<(), ApiError> {
        let request_body = CreateRef {
            ref_name: format!("refs/heads/{}", branch),
            sha: &commit.0,
        };
        let json_data = serde_json::to_string(&request_body)?;
        self.http_client
            .post(&self.repo_path("/git/refs"), &json_data)
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(branch = branch))]
    async fn delete_ref(&self, branch: &str) -> Result<(), ApiError> {
        let path = self.repo_path(&format!("/git/refs/heads/{}", branch));
        self.http_client.delete(&path).await
    }

    #[instrument(skip_all, fields(branch = branch))]
    async fn update_ref(&self, branch: &str, commit: &CommitId) -> Result<(), ApiError> {
        let request_body = UpdateRef {
            sha: &commit.0,
            force: true,
        };
        let json_data = serde_json::to_string(&request_body)?;
        let path = self.repo_path(&format!("/git/refs/heads/{}", branch));
        self.http_client.patch(&path, &json_data).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn get_commit_tree(&self, commit: &CommitId) -> Result<TreeId, ApiError> {
        let path = self.repo_path(&format!("/git/commits/{}", commit));
        let response = self.http_client.get(&path).await?;
        let git_commit: GitCommit = serde_json::from_str(&response)?;
        Ok(TreeId(git_commit.tree.sha))
    }

    #[instrument(skip_all)]
    async fn create_blob(&self, content: &str) -> Result<BlobId, ApiError> {
        let request_body = CreateBlob {
            content,
            encoding: "utf-8",
        };
        let json_data = serde_json::to_string(&request_body)?;
        let response = self
            .http_client
            .post(&self.repo_path("/git/blobs"), &json_data)
            .await?;
        let blob: GitObject = serde_json::from_str(&response)?;
        debug!("created blob {} ({} bytes)", blob.sha, content.len());
        Ok(BlobId(blob.sha))
    }

    #[instrument(skip_all)]
    async fn create_tree(
        &self,
        base_tree: &TreeId,
        entries: &[TreeEntry],
    ) -> Result<TreeId, ApiError> {
        let request_body = CreateTree {
            base_tree: &base_tree.0,
            tree: entries,
        };
        let json_data = serde_json::to_string(&request_body)?;
        let response = self
            .http_client
            .post(&self.repo_path("/git/trees"), &json_data)
            .await?;
        let tree: GitObject = serde_json::from_str(&response)?;
        Ok(TreeId(tree.sha))
    }

    #[instrument(skip_all)]
    async fn create_commit(
        &self,
        message: &str,
        tree: &TreeId,
        parents: &[CommitId],
    ) -> Result<CommitId, ApiError> {
        let request_body = CreateCommit {
            message,
            tree: &tree.0,
            parents: parents.iter().map(|p| p.0.as_str()).collect(),
        };
        let json_data = serde_json::to_string(&request_body)?;
        let response = self
            .http_client
            .post(&self.repo_path("/git/commits"), &json_data)
            .await?;
        let commit: GitObject = serde_json::from_str(&response)?;
        Ok(CommitId(commit.sha))
    }
}

impl PullRequestOps for GithubClient {
    #[instrument(skip_all)]
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest> {
        let response = self
            .http_client
            .get(&self.repo_path(&format!("/pulls/{}", number)))
            .await
            .with_context(|| format!("Failed to fetch PR #{}", number))?;
        let pr: PullRequestResponse = serde_json::from_str(&response)?;
        Ok(pr.into())
    }

    #[instrument(skip_all)]
    async fn find_open_pull_request(
        &self,
        head_branch: &str,
        base_branch: &str,
    ) -> Result<Option<PullRequest>> {
        let path = self.repo_path(&format!(
            "/pulls?head={}:{}&base={}&state=open",
            self.owner, head_branch, base_branch
        ));
        let response = self
            .http_client
            .get(&path)
            .await
            .context("Failed to search pull requests")?;
        let prs: Vec<PullRequestResponse> = serde_json::from_str(&response)?;
        Ok(prs.into_iter().next().map(PullRequest::from))
    }

    #[instrument(skip_all)]
    async fn create_pull_request(
        &self,
        head_branch: &str,
        base_branch: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest> {
        let request_body = CreatePullRequest {
            title,
            body,
            head: head_branch,
            base: base_branch,
        };
        let json_data = serde_json::to_string(&request_body)?;
        let response = self
            .http_client
            .post(&self.repo_path("/pulls"), &json_data)
            .await
            .context("Failed to create pull request")?;
        let pr: PullRequestResponse = serde_json::from_str(&response)?;
        Ok(pr.into())
    }

    #[instrument(skip_all)]
    async fn update_pull_request(&self, number: u64, title: &str, body: &str) -> Result<PullRequest> {
        let request_body = UpdatePullRequest { title, body };
        let json_data = serde_json::to_string(&request_body)?;
        let response = self
            .http_client
            .patch(&self.repo_path(&format!("/pulls/{}", number)), &json_data)
            .await
            .with_context(|| format!("Failed to update PR #{}", number))?;
        let pr: PullRequestResponse = serde_json::from_str(&response)?;
        Ok(pr.into())
    }

    #[instrument(skip_all)]
    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        let json_data = serde_json::to_string(&AddLabels { labels })?;
        self.http_client
            .post(&self.repo_path(&format!("/issues/{}/labels", number)), &json_data)
            .await
            .with_context(|| format!("Failed to label PR #{}", number))?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn create_comment(&self, number: u64, body: &str) -> Result<()> {
        let json_data = serde_json::to_string(&CreateComment { body })?;
        self.http_client
            .post(
                &self.repo_path(&format!("/issues/{}/comments", number)),
                &json_data,
            )
            .await
            .with_context(|| format!("Failed to comment on PR #{}", number))?;
        Ok(())
    }
}
