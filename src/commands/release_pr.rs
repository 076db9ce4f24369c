use anyhow::Context;
use anyhow::Result;
use colored::Colorize;
use log::info;

use crate::App;
use crate::app::Publication;
use crate::app::RELEASE_COMMIT_MESSAGE;
use crate::changelog::Release;
use crate::changelog::is_changelog;
use crate::changelog::pr_description;
use crate::clients::git::GitOps;
use crate::clients::github::ObjectStoreOps;
use crate::clients::github::PullRequestOps;
use crate::compose::ContentChange;
use crate::reconcile::BranchName;
use crate::reconcile::RefUpdate;

pub const VERSION_PACKAGE_LABEL: &str = "Version Package";

impl<G: GitOps, S: ObjectStoreOps, P: PullRequestOps> App<G, S, P> {
    /// Open or refresh the "Version Packages" PR for `base` (defaults to the
    /// configured base branch).
    pub async fn cmd_release_pr(
        &self,
        base: Option<&str>,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let base = base.unwrap_or(&self.config.base_branch);

        let filter = self.config.path_filter()?;
        let changes = self.collect_changes(&filter).await?;
        if changes.is_empty() {
            writeln!(stdout, "No version files changed, not opening a release PR")?;
            return Ok(());
        }
        let upserts = self.read_contents(&changes).await?;

        // Validate every changelog before writing anything remotely
        let releases = releases(&upserts)?;
        let body = pr_description(&releases);

        let base_tip = self
            .store
            .get_ref(base)
            .await
            .with_context(|| format!("Failed to resolve base branch {}", base))?;
        let branch = BranchName::release_for(base);

        // The open release PR uses this branch as its head: deleting the
        // branch would close it.
        let publication = self
            .publish(
                &branch,
                RefUpdate::ForceMove,
                &base_tip,
                RELEASE_COMMIT_MESSAGE,
                &upserts,
                &changes.delete_paths(),
            )
            .await?;
        let Publication::Published { composed, .. } = publication else {
            writeln!(stdout, "No version files changed, not opening a release PR")?;
            return Ok(());
        };
        writeln!(
            stdout,
            "Pushed {} to {}",
            composed.commit,
            branch.as_str().green()
        )?;

        let existing = self
            .prs
            .find_open_pull_request(branch.as_str(), base)
            .await?;
        let pr = match existing {
            Some(pr) => {
                info!("Updating release PR #{}", pr.number);
                self.prs
                    .update_pull_request(pr.number, RELEASE_COMMIT_MESSAGE, &body)
                    .await?
            }
            None => {
                info!("Creating release PR for {}", branch);
                self.prs
                    .create_pull_request(branch.as_str(), base, RELEASE_COMMIT_MESSAGE, &body)
                    .await?
            }
        };
        self.prs
            .add_labels(pr.number, &[VERSION_PACKAGE_LABEL.to_string()])
            .await?;

        writeln!(stdout, "PR URL: {}", pr.html_url)?;
        Ok(())
    }
}

/// Newest release of every changed changelog, in path order.
fn releases(upserts: &[ContentChange]) -> Result<Vec<Release>> {
    let mut changelogs: Vec<_> = upserts
        .iter()
        .filter(|change| is_changelog(&change.path))
        .collect();
    changelogs.sort_by(|a, b| a.path.cmp(&b.path));
    changelogs
        .into_iter()
        .map(|change| Release::parse(&change.path, &change.contents).map_err(anyhow::Error::from))
        .collect()
}
