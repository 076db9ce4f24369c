use std::path::Path;

use anyhow::Result;
use anyhow::bail;
use colored::Colorize;

use crate::App;
use crate::packages::snapshot_releases;

impl<G, S, P> App<G, S, P> {
    /// Report the snapshot versions present in the workspace at `root`.
    ///
    /// Fails when there are none, which means the bump tool found no
    /// changeset to release.
    pub fn cmd_check_snapshots(&self, root: &Path, stdout: &mut impl std::io::Write) -> Result<()> {
        let releases = snapshot_releases(root)?;

        self.outputs
            .set("SNAPSHOT_RELEASES", &serde_json::to_string(&releases)?, stdout)?;
        self.outputs
            .set("HAS_SNAPSHOTS", &(!releases.is_empty()).to_string(), stdout)?;

        if releases.is_empty() {
            bail!(
                "No snapshot releases found. Please add a changeset before publishing a snapshot \
                 (run `npx changeset` and commit the result)."
            );
        }

        writeln!(stdout, "Found {} snapshot release(s):", releases.len())?;
        for release in &releases {
            writeln!(stdout, "  {}", release.cyan())?;
        }
        Ok(())
    }
}
