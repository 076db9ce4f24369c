//! Reading the changes a version bump left in the working tree.

use log::debug;
use tracing::instrument;

use crate::clients::git::GitOps;
use crate::error::SnapshotError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
    Untracked,
}

/// One entry of `git status --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeRecord {
    /// Path relative to the repository root. For renames, the new path.
    pub path: String,
    pub kind: ChangeKind,
}

impl ChangeKind {
    /// Kind for a two-character `XY` status code.
    ///
    /// A `D` in either column is a deletion. Otherwise the first non-space
    /// character decides.
    pub fn from_status(status: &str) -> Self {
        if status.contains('D') {
            return Self::Deleted;
        }
        match status.trim_start().chars().next() {
            Some('A') | Some('C') => Self::Added,
            Some('R') => Self::Renamed,
            Some('?') => Self::Untracked,
            _ => Self::Modified,
        }
    }
}

impl ChangeRecord {
    /// Parse one non-empty status line, `None` if it carries no path.
    ///
    /// Leading whitespace is trimmed and the line split on single spaces: the
    /// first token is the status code and the last one the path. For
    /// `old -> new` renames this keeps only the new path.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_start();
        if let Some(quoted) = quoted_path(line) {
            let status = line.split(' ').next()?;
            return Some(Self {
                path: quoted,
                kind: ChangeKind::from_status(status),
            });
        }

        let tokens: Vec<&str> = line.split(' ').collect();
        if tokens.len() < 2 {
            return None;
        }
        let status = tokens[0];
        let path = tokens[tokens.len() - 1];
        if path.is_empty() {
            return None;
        }
        Some(Self {
            path: path.to_string(),
            kind: ChangeKind::from_status(status),
        })
    }
}

/// Git quotes paths containing spaces or unusual characters C-style.
fn quoted_path(line: &str) -> Option<String> {
    let without_end = line.strip_suffix('"')?;
    let start = without_end.rfind(" \"")?;
    let quoted = &without_end[start + 2..];

    // Non-ASCII bytes are written as three-digit octal escapes
    let mut bytes = Vec::with_capacity(quoted.len());
    let mut rest = quoted.as_bytes();
    while let Some((&b, tail)) = rest.split_first() {
        rest = tail;
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        let (&escaped, tail) = rest.split_first()?;
        rest = tail;
        match escaped {
            b'n' => bytes.push(b'\n'),
            b't' => bytes.push(b'\t'),
            b'0'..=b'7' => {
                let digits = [escaped, *rest.first()?, *rest.get(1)?];
                let value = digits.iter().try_fold(0u32, |acc, d| match d {
                    b'0'..=b'7' => Some(acc * 8 + u32::from(d - b'0')),
                    _ => None,
                })?;
                bytes.push(u8::try_from(value).ok()?);
                rest = &rest[2..];
            }
            other => bytes.push(other),
        }
    }
    String::from_utf8(bytes).ok().filter(|path| !path.is_empty())
}

/// Parse the full status output into change records, in output order.
pub fn parse_status(output: &str) -> Result<Vec<ChangeRecord>, SnapshotError> {
    let mut lines: Vec<&str> = output.split('\n').collect();
    // Remove empty entry after final linebreak
    if lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    lines
        .into_iter()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .map(|line| {
            ChangeRecord::parse(line).ok_or_else(|| {
                SnapshotError::WorkspaceQueryFailed(format!("malformed status line: {:?}", line))
            })
        })
        .collect()
}

/// Query the working tree for every changed path.
#[instrument(skip_all)]
pub async fn read_changes(git: &impl GitOps) -> Result<Vec<ChangeRecord>, SnapshotError> {
    let output = git
        .status_porcelain()
        .await
        .map_err(|e| SnapshotError::WorkspaceQueryFailed(format!("{:#}", e)))?;
    let records = parse_status(&output)?;
    debug!("working tree reports {} changed paths", records.len());
    Ok(records)
}
