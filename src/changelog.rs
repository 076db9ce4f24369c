//! Release notes for the "Version Packages" pull request.
//!
//! Only changelogs written by changesets are understood:
//!
//! ```text
//! # <package-name>
//!
//! ## <newest version>
//!
//! ### Patch Changes
//!
//! - ...
//!
//! ## <older version>
//! ```
//!
//! Anything that deviates is rejected rather than guessed at.

use thiserror::Error;

pub const PR_INTRO: &str = "This PR was opened by snapit. When you're ready to do a release, \
you can merge this and the packages will be published automatically. If you're not ready to \
do a release yet, that's fine: whenever you add more changesets to the base branch, this PR \
will be updated.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChangelogError {
    #[error("{path}: first line must be '# <package-name>'")]
    MissingTitle { path: String },

    #[error("{path}: no '## <version>' heading found")]
    MissingVersion { path: String },

    #[error("{path}: version heading for {version} has no entries")]
    EmptyRelease { path: String, version: String },
}

/// The newest release described by a changelog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub package: String,
    pub version: String,
    /// Everything between the version heading and the next one, trimmed.
    pub notes: String,
}

impl Release {
    /// Extract the newest release from changelog `contents` read from `path`.
    pub fn parse(path: &str, contents: &str) -> Result<Self, ChangelogError> {
        let mut lines = contents.lines();

        let package = lines
            .next()
            .and_then(|line| line.strip_prefix("# "))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ChangelogError::MissingTitle {
                path: path.to_string(),
            })?
            .to_string();

        let version = lines
            .by_ref()
            .find_map(|line| line.strip_prefix("## "))
            .map(str::trim)
            .filter(|version| !version.is_empty())
            .ok_or_else(|| ChangelogError::MissingVersion {
                path: path.to_string(),
            })?
            .to_string();

        let notes = lines
            .take_while(|line| !line.starts_with("## "))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();
        if notes.is_empty() {
            return Err(ChangelogError::EmptyRelease {
                path: path.to_string(),
                version,
            });
        }

        Ok(Self {
            package,
            version,
            notes,
        })
    }

    pub fn render(&self) -> String {
        format!(
            "## {}@{}\n\n-----\n\n{}\n\n",
            self.package, self.version, self.notes
        )
    }
}

/// Body of the release PR: the intro followed by one section per release.
pub fn pr_description(releases: &[Release]) -> String {
    let mut description = format!("{}\n\n-----\n\n", PR_INTRO);
    for release in releases {
        description.push_str(&release.render());
    }
    description
}

pub fn is_changelog(path: &str) -> bool {
    path == "CHANGELOG.md" || path.ends_with("/CHANGELOG.md")
}
