//! Placing a composed commit at the tip of a derived branch.
//!
//! The branch is driven through a small state machine rather than a forced
//! ref update:
//!
//! - `Absent` (lookup returns not-found): create the ref at the commit.
//! - `Present`: move the ref to the commit, as chosen by [`RefUpdate`]. Any
//!   earlier synthetic commit is dropped, so the branch is always "source tip
//!   plus one commit".
//! - Lookup failed otherwise: stop without writing anything.
//!
//! [`RefUpdate::Recreate`] deletes the ref and creates it again. This is not
//! atomic: a run interrupted in between leaves the branch absent, which the
//! next run handles through the `Absent` path. Deleting a branch closes every
//! pull request whose head it is, so branches that carry a pull request use
//! [`RefUpdate::ForceMove`].

use std::fmt::Display;

use log::info;
use tracing::instrument;

use crate::clients::github::ObjectStoreOps;
use crate::clients::github_curl::ApiError;
use crate::error::SnapshotError;
use crate::objects::CommitId;

pub const SNAPSHOT_BRANCH_PREFIX: &str = "snapshot-release/";
pub const RELEASE_BRANCH_PREFIX: &str = "changeset-release/";

// -----------------------------------------------------------------------------
// Types

/// A branch derived from another one. Never chosen freely, so repeated runs
/// for the same source always land on the same branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    /// `snapshot-release/<source>`
    pub fn snapshot_for(source_branch: &str) -> Self {
        Self(format!(
            "{}{}",
            SNAPSHOT_BRANCH_PREFIX,
            strip_heads_prefix(source_branch)
        ))
    }

    /// `changeset-release/<base>`
    pub fn release_for(base_branch: &str) -> Self {
        Self(format!(
            "{}{}",
            RELEASE_BRANCH_PREFIX,
            strip_heads_prefix(base_branch)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `heads/<name>`, as reported in step outputs.
    pub fn short_ref(&self) -> String {
        format!("heads/{}", self.0)
    }
}

impl Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn strip_heads_prefix(branch: &str) -> &str {
    branch.strip_prefix("refs/heads/").unwrap_or(branch)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchState {
    Absent,
    Present(CommitId),
}

/// How a `Present` branch is moved to the new commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefUpdate {
    /// Delete the ref, then create it at the commit.
    Recreate,
    /// Forced in-place update. The branch never stops existing.
    ForceMove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Created,
    Recreated { previous: CommitId },
    Moved { previous: CommitId },
}

pub struct BranchReconciler<'a, S> {
    store: &'a S,
    update: RefUpdate,
}

// -----------------------------------------------------------------------------
// BranchReconciler impl

impl<'a, S: ObjectStoreOps> BranchReconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            update: RefUpdate::Recreate,
        }
    }

    pub fn with_update(mut self, update: RefUpdate) -> Self {
        self.update = update;
        self
    }

    /// Current state of `branch`. Not-found is a state, not an error.
    pub async fn branch_state(&self, branch: &BranchName) -> Result<BranchState, SnapshotError> {
        match self.store.get_ref(branch.as_str()).await {
            Ok(commit) => Ok(BranchState::Present(commit)),
            Err(err) if err.is_not_found() => Ok(BranchState::Absent),
            Err(source) => Err(SnapshotError::BranchStateIndeterminate {
                branch: branch.to_string(),
                source,
            }),
        }
    }

    /// Make `branch` exist and point exactly at `commit`.
    #[instrument(skip_all, fields(branch = branch.as_str()))]
    pub async fn reconcile(
        &self,
        branch: &BranchName,
        commit: &CommitId,
    ) -> Result<Reconciliation, SnapshotError> {
        let failed = |source: ApiError| SnapshotError::RefReconciliationFailed {
            branch: branch.to_string(),
            commit: commit.clone(),
            source,
        };

        match self.branch_state(branch).await? {
            BranchState::Absent => {
                self.store
                    .create_ref(branch.as_str(), commit)
                    .await
                    .map_err(failed)?;
                info!("Created branch {} at {}", branch, commit);
                Ok(Reconciliation::Created)
            }
            BranchState::Present(previous) if self.update == RefUpdate::ForceMove => {
                self.store
                    .update_ref(branch.as_str(), commit)
                    .await
                    .map_err(failed)?;
                info!("Moved branch {} to {} (was {})", branch, commit, previous);
                Ok(Reconciliation::Moved { previous })
            }
            BranchState::Present(previous) => {
                self.store
                    .delete_ref(branch.as_str())
                    .await
                    .map_err(failed)?;
                self.store
                    .create_ref(branch.as_str(), commit)
                    .await
                    .map_err(failed)?;
                info!(
                    "Recreated branch {} at {} (was {})",
                    branch, commit, previous
                );
                Ok(Reconciliation::Recreated { previous })
            }
        }
    }
}
