use anyhow::Result;
use colored::Colorize;

use crate::App;
use crate::clients::git::GitOps;
use crate::clients::github::ObjectStoreOps;

impl<G: GitOps, S: ObjectStoreOps, P> App<G, S, P> {
    /// Show which working tree changes a snapshot would carry. Local only.
    pub async fn cmd_status(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        let filter = self.config.path_filter()?;
        let changes = self.collect_changes(&filter).await?;

        if changes.is_empty() {
            writeln!(stdout, "{}", "No version files changed".dimmed())?;
            return Ok(());
        }

        for record in &changes.to_upsert {
            writeln!(stdout, "{} {}", "+".green(), record.path)?;
        }
        for record in &changes.to_delete {
            writeln!(stdout, "{} {}", "-".red(), record.path)?;
        }
        Ok(())
    }
}
