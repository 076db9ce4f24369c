use anyhow::Result;
use colored::Colorize;

use crate::App;
use crate::app::Publication;
use crate::app::SNAPSHOT_COMMIT_MESSAGE;
use crate::clients::git::GitOps;
use crate::clients::github::ObjectStoreOps;
use crate::clients::github::PullRequestOps;
use crate::reconcile::BranchName;
use crate::reconcile::Reconciliation;
use crate::reconcile::RefUpdate;

impl<G: GitOps, S: ObjectStoreOps, P: PullRequestOps> App<G, S, P> {
    /// Commit the working tree's version files on top of PR `pr_number`'s head
    /// and point `snapshot-release/<head>` at the result.
    pub async fn cmd_snapshot(&self, pr_number: u64, stdout: &mut impl std::io::Write) -> Result<()> {
        let pr = self.prs.get_pull_request(pr_number).await?;
        writeln!(stdout, "Source branch: {}", pr.head_branch)?;
        writeln!(stdout, "Source commit: {}", pr.head_sha)?;

        let filter = self.config.path_filter()?;
        let changes = self.collect_changes(&filter).await?;
        let upserts = self.read_contents(&changes).await?;
        let branch = BranchName::snapshot_for(&pr.head_branch);

        let publication = self
            .publish(
                &branch,
                RefUpdate::Recreate,
                &pr.head_sha,
                SNAPSHOT_COMMIT_MESSAGE,
                &upserts,
                &changes.delete_paths(),
            )
            .await?;

        match publication {
            Publication::NoRelevantChanges => {
                writeln!(stdout, "{}", "No version files changed, nothing to snapshot".yellow())?;
                self.outputs.set("SNAPSHOT_CREATED", "false", stdout)?;
            }
            Publication::Published {
                branch,
                composed,
                reconciliation,
            } => {
                match reconciliation {
                    Reconciliation::Created => {
                        writeln!(stdout, "Created branch {}", branch.as_str().green())?
                    }
                    Reconciliation::Recreated { previous } => writeln!(
                        stdout,
                        "Recreated branch {} (was {})",
                        branch.as_str().green(),
                        previous
                    )?,
                    Reconciliation::Moved { previous } => writeln!(
                        stdout,
                        "Moved branch {} (was {})",
                        branch.as_str().green(),
                        previous
                    )?,
                }
                self.outputs.set("SNAPSHOT_CREATED", "true", stdout)?;
                self.outputs
                    .set("SNAPSHOT_BRANCH_REF", &branch.short_ref(), stdout)?;
                self.outputs
                    .set("SNAPSHOT_COMMIT", &composed.commit.0, stdout)?;
            }
        }

        Ok(())
    }
}
