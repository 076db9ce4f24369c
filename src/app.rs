use futures_util::future::try_join_all;
use log::info;

use crate::classify::ClassifiedChanges;
use crate::classify::PathFilter;
use crate::classify::classify;
use crate::clients::git::GitOps;
use crate::clients::github::ObjectStoreOps;
use crate::compose::ComposedCommit;
use crate::compose::Composer;
use crate::compose::Composition;
use crate::compose::ContentChange;
use crate::config::Config;
use crate::error::SnapshotError;
use crate::objects::CommitId;
use crate::outputs::StepOutputs;
use crate::reconcile::BranchName;
use crate::reconcile::BranchReconciler;
use crate::reconcile::Reconciliation;
use crate::reconcile::RefUpdate;
use crate::workspace::ChangeRecord;
use crate::workspace::read_changes;

pub const SNAPSHOT_COMMIT_MESSAGE: &str = "Snapshot release";
pub const RELEASE_COMMIT_MESSAGE: &str = "Version Packages";

/// Everything a command needs, passed explicitly.
pub struct App<G, S, P> {
    pub config: Config,
    /// Local working tree
    pub git: G,
    /// Remote object store
    pub store: S,
    /// Pull requests and issues
    pub prs: P,
    pub outputs: StepOutputs,
}

/// Result of placing the workspace changes on a derived branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publication {
    Published {
        branch: BranchName,
        composed: ComposedCommit,
        reconciliation: Reconciliation,
    },
    NoRelevantChanges,
}

impl<G, S, P> App<G, S, P> {
    pub fn new(config: Config, git: G, store: S, prs: P) -> Self {
        Self {
            config,
            git,
            store,
            prs,
            outputs: StepOutputs::new(None),
        }
    }

    pub fn with_outputs(mut self, outputs: StepOutputs) -> Self {
        self.outputs = outputs;
        self
    }
}

/// Shared helper methods for App
impl<G: GitOps, S: ObjectStoreOps, P> App<G, S, P> {
    /// Changed paths in the working tree that belong in a release commit.
    pub async fn collect_changes(
        &self,
        filter: &PathFilter,
    ) -> Result<ClassifiedChanges, SnapshotError> {
        let records = read_changes(&self.git).await?;
        let changes = classify(&records, filter)?;
        info!(
            "{} files to write, {} to delete",
            changes.to_upsert.len(),
            changes.to_delete.len()
        );
        Ok(changes)
    }

    /// Read the current contents of every upserted path.
    pub async fn read_contents(
        &self,
        changes: &ClassifiedChanges,
    ) -> Result<Vec<ContentChange>, SnapshotError> {
        try_join_all(changes.to_upsert.iter().map(|record| self.read_content(record))).await
    }

    async fn read_content(&self, record: &ChangeRecord) -> Result<ContentChange, SnapshotError> {
        let unreadable = |message: String| SnapshotError::ContentUnreadable {
            path: record.path.clone(),
            message,
        };
        let bytes = self
            .git
            .read_worktree_file(&record.path)
            .await
            .map_err(|e| unreadable(format!("{:#}", e)))?;
        let contents = String::from_utf8(bytes).map_err(|_| unreadable("not UTF-8".to_string()))?;
        Ok(ContentChange {
            path: record.path.clone(),
            contents,
        })
    }

    /// Commit `upserts` and `deletes` on top of `parent` and point `branch` at
    /// the result, moving an existing branch with `update`.
    pub async fn publish(
        &self,
        branch: &BranchName,
        update: RefUpdate,
        parent: &CommitId,
        message: &str,
        upserts: &[ContentChange],
        deletes: &[String],
    ) -> Result<Publication, SnapshotError> {
        let composition = Composer::new(&self.store)
            .with_blob_concurrency(self.config.blob_concurrency)
            .with_retry(self.config.retry_policy())
            .compose(parent, message, upserts, deletes)
            .await?;

        let composed = match composition {
            Composition::Committed(composed) => composed,
            Composition::NoRelevantChanges => return Ok(Publication::NoRelevantChanges),
        };

        let reconciliation = BranchReconciler::new(&self.store)
            .with_update(update)
            .reconcile(branch, &composed.commit)
            .await?;

        Ok(Publication::Published {
            branch: branch.clone(),
            composed,
            reconciliation,
        })
    }
}
