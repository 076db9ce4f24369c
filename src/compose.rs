//! Writing workspace changes as a commit through the remote object store.
//!
//! A composition is the write sequence blob → tree → commit:
//!
//! 1. Resolve the parent commit's tree.
//! 2. Upload every changed file as a blob. Uploads run concurrently on a
//!    bounded pool and all of them complete before step 3 starts.
//! 3. Write one tree: the parent tree with the uploaded blobs set and the
//!    deleted paths removed.
//! 4. Write a commit with that tree and the parent as its only parent.
//!
//! Refs are never touched here; placing the commit on a branch is the job of
//! [`crate::reconcile`]. A failed composition leaves at most some unreferenced
//! objects behind.

use std::time::Duration;

use futures_util::StreamExt as _;
use futures_util::TryStreamExt as _;
use futures_util::stream;
use log::debug;
use log::info;
use log::warn;
use tracing::instrument;

use crate::clients::github::ObjectStoreOps;
use crate::error::CompositionStage;
use crate::error::SnapshotError;
use crate::objects::BlobId;
use crate::objects::CommitId;
use crate::objects::TreeEntry;
use crate::objects::TreeId;

pub const DEFAULT_BLOB_CONCURRENCY: usize = 8;

// -----------------------------------------------------------------------------
// Types

/// Full current contents of a changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    pub path: String,
    pub contents: String,
}

/// Retries for blob uploads that failed transiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per blob, including the first one.
    pub attempts: u32,
    /// Wait before retry `n` is `n * backoff`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedCommit {
    pub commit: CommitId,
    pub tree: TreeId,
    pub parent: CommitId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    Committed(ComposedCommit),
    /// Nothing to upsert or delete; no object was written.
    NoRelevantChanges,
}

pub struct Composer<'a, S> {
    store: &'a S,
    blob_concurrency: usize,
    retry: RetryPolicy,
}

// -----------------------------------------------------------------------------
// Composer impl

impl<'a, S: ObjectStoreOps> Composer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            blob_concurrency: DEFAULT_BLOB_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_blob_concurrency(mut self, blob_concurrency: usize) -> Self {
        self.blob_concurrency = blob_concurrency.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create a child of `parent` whose tree is the parent's tree with `upserts`
    /// written and `deletes` removed.
    #[instrument(skip_all)]
    pub async fn compose(
        &self,
        parent: &CommitId,
        message: &str,
        upserts: &[ContentChange],
        deletes: &[String],
    ) -> Result<Composition, SnapshotError> {
        if upserts.is_empty() && deletes.is_empty() {
            info!("No relevant changes, skipping commit");
            return Ok(Composition::NoRelevantChanges);
        }

        let parent_tree = self.resolve_parent_tree(parent).await?;
        let blobs = self.write_blobs(upserts).await?;
        let tree = self.build_tree(&parent_tree, blobs, deletes).await?;
        let commit = self.create_commit(message, &tree, parent).await?;
        info!("Composed commit {} on top of {}", commit, parent);

        Ok(Composition::Committed(ComposedCommit {
            commit,
            tree,
            parent: parent.clone(),
        }))
    }

    pub async fn resolve_parent_tree(&self, parent: &CommitId) -> Result<TreeId, SnapshotError> {
        let tree = self
            .store
            .get_commit_tree(parent)
            .await
            .map_err(|source| SnapshotError::CommitCompositionFailed {
                stage: CompositionStage::ResolveParentTree,
                source,
            })?;
        debug!("parent {} has tree {}", parent, tree);
        Ok(tree)
    }

    /// Upload every change, returning `(path, blob)` pairs in input order.
    ///
    /// Returns only once every upload has finished, or on the first failure.
    pub async fn write_blobs(
        &self,
        upserts: &[ContentChange],
    ) -> Result<Vec<(String, BlobId)>, SnapshotError> {
        stream::iter(upserts)
            .map(|change| self.write_blob(change))
            .buffered(self.blob_concurrency)
            .try_collect()
            .await
    }

    async fn write_blob(&self, change: &ContentChange) -> Result<(String, BlobId), SnapshotError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.create_blob(&change.contents).await {
                Ok(blob) => {
                    debug!("{} -> blob {}", change.path, blob);
                    return Ok((change.path.clone(), blob));
                }
                Err(err) if err.is_transient() && attempt < attempts => {
                    warn!(
                        "Blob upload for {} failed (attempt {}/{}): {}",
                        change.path, attempt, attempts, err
                    );
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                    attempt += 1;
                }
                Err(source) => {
                    return Err(SnapshotError::CommitCompositionFailed {
                        stage: CompositionStage::WriteBlob,
                        source,
                    });
                }
            }
        }
    }

    pub async fn build_tree(
        &self,
        parent_tree: &TreeId,
        upserts: Vec<(String, BlobId)>,
        deletes: &[String],
    ) -> Result<TreeId, SnapshotError> {
        let entries: Vec<TreeEntry> = upserts
            .into_iter()
            .map(|(path, blob)| TreeEntry::upsert(path, blob))
            .chain(deletes.iter().map(TreeEntry::removal))
            .collect();

        self.store
            .create_tree(parent_tree, &entries)
            .await
            .map_err(|source| SnapshotError::CommitCompositionFailed {
                stage: CompositionStage::BuildTree,
                source,
            })
    }

    pub async fn create_commit(
        &self,
        message: &str,
        tree: &TreeId,
        parent: &CommitId,
    ) -> Result<CommitId, SnapshotError> {
        self.store
            .create_commit(message, tree, std::slice::from_ref(parent))
            .await
            .map_err(|source| SnapshotError::CommitCompositionFailed {
                stage: CompositionStage::CreateCommit,
                source,
            })
    }
}
