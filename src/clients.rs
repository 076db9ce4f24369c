//! Clients for the systems that `snapit` talks to.
//!
//! - [`git`]: The local working tree (status query, file contents)
//! - [`github`]: The git data API used as a remote object store, plus pull requests
//! - [`github_curl`]: Curl-based HTTP client for making GitHub API requests
//!
//! The git and GitHub clients sit behind traits with mock implementations for
//! testing.

pub mod git;
pub mod github;
pub mod github_curl;
#[cfg(test)]
pub(crate) mod memory;
