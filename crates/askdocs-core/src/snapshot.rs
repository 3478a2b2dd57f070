//! File snapshots for change detection.
//!
//! A [`FileSnapshot`] is the sorted list of `path|mtime` lines describing
//! every regular file under a document root. Two snapshots compare equal
//! exactly when the same files exist with the same modification times,
//! independent of the order the filesystem enumerated them in.
//!
//! Walking the filesystem happens in the app crate; this module only
//! builds, renders, parses, and compares snapshots.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// One `(path, modification time)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub path: PathBuf,
    /// Modification time as an offset from the Unix epoch.
    pub modified: Duration,
}

impl SnapshotEntry {
    pub fn new(path: impl Into<PathBuf>, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            // Pre-epoch timestamps collapse to zero.
            modified: modified
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default(),
        }
    }

    /// Render as `path|secs.nanos`, with nanoseconds zero-padded to nine digits.
    pub fn to_line(&self) -> String {
        format_line(&self.path, self.modified)
    }
}

fn format_line(path: &Path, modified: Duration) -> String {
    format!(
        "{}|{}.{:09}",
        path.display(),
        modified.as_secs(),
        modified.subsec_nanos()
    )
}

/// Sorted `path|mtime` lines for a document root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSnapshot {
    lines: Vec<String>,
}

/// Lines present in only one of two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl FileSnapshot {
    /// Build a snapshot, sorting entries lexicographically by their rendered line.
    pub fn from_entries(entries: impl IntoIterator<Item = SnapshotEntry>) -> Self {
        let mut lines: Vec<String> = entries.into_iter().map(|e| e.to_line()).collect();
        lines.sort();
        Self { lines }
    }

    /// Parse a persisted record. Line order is kept as written.
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content
                .lines()
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Render as newline-joined text, the tracker record format.
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines added since `previous` and lines no longer present.
    ///
    /// A modified file shows up as one removal plus one addition.
    pub fn diff(&self, previous: &FileSnapshot) -> SnapshotDiff {
        let ours: BTreeSet<&String> = self.lines.iter().collect();
        let theirs: BTreeSet<&String> = previous.lines.iter().collect();
        SnapshotDiff {
            added: ours.difference(&theirs).map(|s| s.to_string()).collect(),
            removed: theirs.difference(&ours).map(|s| s.to_string()).collect(),
        }
    }
}
