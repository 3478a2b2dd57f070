//! Document-root walking and change detection.
//!
//! [`scan_tree`] is the single filesystem walk used both for snapshots and
//! for index builds, so the files a build reads are exactly the files its
//! baseline snapshot describes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use askdocs_core::snapshot::{FileSnapshot, SnapshotEntry};
use askdocs_core::store::TrackerStore;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Result of walking a document root.
#[derive(Debug, Clone, Default)]
pub struct TreeScan {
    /// Regular files with their modification times, in path order.
    pub files: Vec<(PathBuf, SystemTime)>,
    /// Directories with no direct regular-file children, in path order.
    pub empty_folders: Vec<PathBuf>,
}

/// Make `root` absolute without requiring it to exist.
pub fn absolute_root(root: &Path) -> PathBuf {
    std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf())
}

/// Recursively walk `root`. A missing root scans as empty.
///
/// Entries that cannot be read (permission errors, vanished files) are
/// logged and left out, as are files whose path contains a line break:
/// the tracker record stores one path per line and could not read them back.
pub fn scan_tree(root: &Path) -> TreeScan {
    let root = absolute_root(root);
    if !root.is_dir() {
        debug!(root = %root.display(), "document root missing; nothing to scan");
        return TreeScan::default();
    }

    let mut files = Vec::new();
    let mut direct_files: BTreeMap<PathBuf, usize> = BTreeMap::new();

    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            direct_files.entry(entry.path().to_path_buf()).or_insert(0);
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        if has_line_break(entry.path()) {
            warn!(path = ?entry.path(), "path contains a line break; skipping");
            continue;
        }

        let modified = match entry.metadata().map(|m| m.modified()) {
            Ok(Ok(t)) => t,
            Ok(Err(e)) => {
                warn!(path = %entry.path().display(), error = %e, "no modification time; skipping");
                continue;
            }
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "unreadable metadata; skipping");
                continue;
            }
        };

        if let Some(parent) = entry.path().parent() {
            *direct_files.entry(parent.to_path_buf()).or_insert(0) += 1;
        }
        files.push((entry.into_path(), modified));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    let empty_folders = direct_files
        .into_iter()
        .filter(|(_, count)| *count == 0)
        .map(|(dir, _)| dir)
        .collect();

    TreeScan {
        files,
        empty_folders,
    }
}

fn has_line_break(path: &Path) -> bool {
    path.as_os_str()
        .as_encoded_bytes()
        .iter()
        .any(|&b| b == b'\n' || b == b'\r')
}

/// Snapshot every regular file under `root` as sorted `path|mtime` lines.
pub fn snapshot(root: &Path) -> FileSnapshot {
    snapshot_of(&scan_tree(root))
}

/// Snapshot an existing scan without walking again.
pub fn snapshot_of(scan: &TreeScan) -> FileSnapshot {
    FileSnapshot::from_entries(
        scan.files
            .iter()
            .map(|(path, modified)| SnapshotEntry::new(path.clone(), *modified)),
    )
}

/// True when `tracker` has no record or its record differs from the
/// current state of `root`.
pub fn has_changed(root: &Path, tracker: &dyn TrackerStore) -> bool {
    let Some(previous) = tracker.load() else {
        return true;
    };
    let current = snapshot(root);
    if current == previous {
        return false;
    }

    let diff = current.diff(&previous);
    debug!(
        added = diff.added.len(),
        removed = diff.removed.len(),
        "document root changed since last build"
    );
    true
}

/// Record the current state of `root` as the new baseline.
pub fn save(root: &Path, tracker: &dyn TrackerStore) -> std::io::Result<()> {
    record(&snapshot(root), tracker)
}

/// Record an already-taken snapshot as the new baseline.
pub fn record(baseline: &FileSnapshot, tracker: &dyn TrackerStore) -> std::io::Result<()> {
    debug!(files = baseline.len(), "recording tracker baseline");
    tracker.save(baseline)
}
