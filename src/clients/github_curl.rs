use std::process::Stdio;

use serde::Deserialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt as _;
use tokio::process::Command;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Failure of a single GitHub API request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no GitHub token configured (set GITHUB_TOKEN or git config snapit.githubToken)")]
    MissingToken,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("GitHub API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// curl could not be run or never got a response.
    #[error("network error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the same request may succeed if issued again unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct GitHubError {
    message: String,
    #[serde(default)]
    #[allow(dead_code)]
    documentation_url: Option<String>,
}

/// HTTP client using curl for making GitHub API requests
#[derive(Clone)]
pub struct GithubCurlClient {
    token: Option<String>,
    api_url: String,
}

impl GithubCurlClient {
    pub fn new(token: Option<String>, api_url: String) -> Self {
        Self { token, api_url }
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<String, ApiError> {
        self.request("GET", path, None).await
    }

    /// Make a POST request
    pub async fn post(&self, path: &str, json_data: &str) -> Result<String, ApiError> {
        self.request("POST", path, Some(json_data)).await
    }

    /// Make a PATCH request
    pub async fn patch(&self, path: &str, json_data: &str) -> Result<String, ApiError> {
        self.request("PATCH", path, Some(json_data)).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request("DELETE", path, None).await?;
        Ok(())
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        json_data: Option<&str>,
    ) -> Result<String, ApiError> {
        let token = self.token.as_deref().ok_or(ApiError::MissingToken)?;
        let url = format!("{}{}", self.api_url.trim_end_matches('/'), path);

        let mut args = vec![
            "-s".to_string(),
            "-w".to_string(),
            "\n%{http_code}".to_string(),
            "-X".to_string(),
            method.to_string(),
            "-H".to_string(),
            format!("Authorization: Bearer {}", token),
            "-H".to_string(),
            "Accept: application/vnd.github+json".to_string(),
            "-H".to_string(),
            "X-GitHub-Api-Version: 2022-11-28".to_string(),
            "-H".to_string(),
            "User-Agent: snapit".to_string(),
        ];
        // Bodies go through stdin: blob payloads can exceed the argument size limit.
        if json_data.is_some() {
            args.extend([
                "-H".to_string(),
                "Content-Type: application/json".to_string(),
                "--data-binary".to_string(),
                "@-".to_string(),
            ]);
        }
        args.push(url);

        let mut child = Command::new("curl")
            .args(&args)
            .stdin(if json_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ApiError::Transport(format!("failed to execute curl: {}", e)))?;

        if let Some(body) = json_data {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(body.as_bytes())
                    .await
                    .map_err(|e| ApiError::Transport(format!("failed to send body: {}", e)))?;
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ApiError::Transport(format!("failed to wait for curl: {}", e)))?;

        if !output.status.success() {
            return Err(ApiError::Transport(format!(
                "curl command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        parse_response(output.stdout)
    }
}

/// Parse curl response with status code appended
fn parse_response(stdout: Vec<u8>) -> Result<String, ApiError> {
    let output_str = String::from_utf8(stdout).map_err(|e| ApiError::Decode(e.to_string()))?;
    let (response, status) = output_str
        .rsplit_once('\n')
        .unwrap_or(("", output_str.as_str()));
    let status_code = status.trim().parse::<u16>().unwrap_or(0);

    if status_code == 0 {
        return Err(ApiError::Transport("no HTTP response received".to_string()));
    }

    if status_code >= 400 {
        // Try to parse error message from response
        let message = serde_json::from_str::<GitHubError>(response)
            .map(|error| error.message)
            .unwrap_or_else(|_| response.to_string());
        if status_code == 404 {
            return Err(ApiError::NotFound(message));
        }
        return Err(ApiError::Status {
            status: status_code,
            message,
        });
    }

    Ok(response.to_string())
}
