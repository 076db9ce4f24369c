use std::fmt::Display;

use serde::Serialize;

// -----------------------------------------------------------------------------
// Object IDs

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobId(pub String);

impl Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Display for TreeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Display for BlobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// -----------------------------------------------------------------------------
// Tree entries

/// Mode of a regular, non-executable file.
pub const REGULAR_FILE_MODE: &str = "100644";

/// One path in a tree write, relative to the base tree.
///
/// A `None` blob is the removal marker: the path is dropped from the base tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub object_type: &'static str,
    #[serde(rename = "sha", serialize_with = "serialize_blob")]
    pub blob: Option<BlobId>,
}

impl TreeEntry {
    pub fn upsert(path: impl Into<String>, blob: BlobId) -> Self {
        Self {
            path: path.into(),
            mode: REGULAR_FILE_MODE,
            object_type: "blob",
            blob: Some(blob),
        }
    }

    pub fn removal(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: REGULAR_FILE_MODE,
            object_type: "blob",
            blob: None,
        }
    }
}

fn serialize_blob<S: serde::Serializer>(blob: &Option<BlobId>, s: S) -> Result<S::Ok, S::Error> {
    match blob {
        Some(id) => s.serialize_str(&id.0),
        None => s.serialize_none(),
    }
}
