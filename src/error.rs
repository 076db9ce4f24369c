//! Errors raised while turning workspace changes into a snapshot commit.
//!
//! Every variant is fatal for the current run. What differs is what a retry has
//! to redo:
//!
//! - [`SnapshotError::CommitCompositionFailed`]: rerun the whole pipeline. All
//!   writes are content addressed, so the orphaned objects are harmless.
//! - [`SnapshotError::RefReconciliationFailed`]: the composed commit is valid
//!   and carried in the error; only the ref has to be placed again.
//! - [`SnapshotError::BranchStateIndeterminate`]: the branch state is unknown,
//!   so nothing was written.

use thiserror::Error;

use crate::clients::github_curl::ApiError;
use crate::objects::CommitId;

/// Object-store write that failed during composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionStage {
    ResolveParentTree,
    WriteBlob,
    BuildTree,
    CreateCommit,
}

impl std::fmt::Display for CompositionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ResolveParentTree => "resolve parent tree",
            Self::WriteBlob => "write blob",
            Self::BuildTree => "build tree",
            Self::CreateCommit => "create commit",
        })
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    /// `git status` could not be run or its output could not be parsed.
    #[error("workspace status query failed: {0}")]
    WorkspaceQueryFailed(String),

    /// The same path was reported as both deleted and changed.
    #[error("conflicting status entries for '{0}': reported as both deleted and changed")]
    ConflictingStatus(String),

    /// A file selected for upload could not be read from the working tree.
    #[error("cannot read '{path}' from the working tree: {message}")]
    ContentUnreadable { path: String, message: String },

    /// The branch lookup failed with something other than not-found.
    #[error("cannot determine state of branch '{branch}': {source}")]
    BranchStateIndeterminate {
        branch: String,
        #[source]
        source: ApiError,
    },

    /// A blob, tree or commit write failed.
    #[error("commit composition failed at {stage}: {source}")]
    CommitCompositionFailed {
        stage: CompositionStage,
        #[source]
        source: ApiError,
    },

    /// Deleting or creating the branch ref failed after the commit was composed.
    #[error("failed to point branch '{branch}' at composed commit {commit}: {source}")]
    RefReconciliationFailed {
        branch: String,
        commit: CommitId,
        #[source]
        source: ApiError,
    },
}
