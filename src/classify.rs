use std::collections::HashMap;

use regex::RegexSet;

use crate::error::SnapshotError;
use crate::workspace::ChangeKind;
use crate::workspace::ChangeRecord;

/// Files written by `changeset version`: manifests, changelogs and the
/// changeset metadata directory.
pub const DEFAULT_VERSION_FILE_PATTERNS: &[&str] =
    &[r"package\.json$", r"(^|/)\.changeset/", r"CHANGELOG\.md$"];

/// Paths that belong in a snapshot commit.
#[derive(Debug, Clone)]
pub struct PathFilter {
    patterns: RegexSet,
}

impl PathFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            patterns: RegexSet::new(patterns)?,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.is_match(path)
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self {
            patterns: RegexSet::new(DEFAULT_VERSION_FILE_PATTERNS)
                .unwrap_or_else(|_| RegexSet::empty()),
        }
    }
}

/// Relevant changes, split by the tree operation they need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedChanges {
    /// Created or modified: need a content read and a blob write.
    pub to_upsert: Vec<ChangeRecord>,
    /// Deleted: need a removal marker in the tree write.
    pub to_delete: Vec<ChangeRecord>,
}

impl ClassifiedChanges {
    pub fn is_empty(&self) -> bool {
        self.to_upsert.is_empty() && self.to_delete.is_empty()
    }

    pub fn delete_paths(&self) -> Vec<String> {
        self.to_delete.iter().map(|r| r.path.clone()).collect()
    }
}

/// Keep the records matching `filter`, partitioned into upserts and deletes.
///
/// Status output is a snapshot, so a path may appear only once. A path
/// reported both as deleted and as changed is rejected.
pub fn classify(
    records: &[ChangeRecord],
    filter: &PathFilter,
) -> Result<ClassifiedChanges, SnapshotError> {
    let mut seen: HashMap<&str, bool> = HashMap::new();
    let mut changes = ClassifiedChanges::default();

    for record in records.iter().filter(|r| filter.matches(&r.path)) {
        let is_delete = record.kind == ChangeKind::Deleted;
        match seen.insert(&record.path, is_delete) {
            Some(previous) if previous != is_delete => {
                return Err(SnapshotError::ConflictingStatus(record.path.clone()));
            }
            Some(_) => continue,
            None => {}
        }

        if is_delete {
            changes.to_delete.push(record.clone());
        } else {
            changes.to_upsert.push(record.clone());
        }
    }

    Ok(changes)
}
