//! File-backed persistence: the tracker record and the index directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use askdocs_core::models::VectorIndex;
use askdocs_core::snapshot::FileSnapshot;
use askdocs_core::store::{IndexStore, TrackerStore};
use tracing::warn;

/// Name of the serialized index inside the storage directory.
pub const INDEX_FILE: &str = "index.json";

/// Tracker record kept in a text file, one `path|mtime` per line.
#[derive(Debug, Clone)]
pub struct FileTracker {
    path: PathBuf,
}

impl FileTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TrackerStore for FileTracker {
    fn load(&self) -> Option<FileSnapshot> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Some(FileSnapshot::parse(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "tracker record unreadable; treating as absent");
                None
            }
        }
    }

    fn save(&self, snapshot: &FileSnapshot) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, snapshot.render())
    }
}

/// Vector index persisted as JSON inside a storage directory.
#[derive(Debug, Clone)]
pub struct DirIndexStore {
    dir: PathBuf,
}

impl DirIndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }
}

impl IndexStore for DirIndexStore {
    fn is_populated(&self) -> bool {
        fs::read_dir(&self.dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
    }

    fn load(&self) -> Result<VectorIndex> {
        let path = self.index_path();
        let content = fs::read(&path)
            .with_context(|| format!("Failed to read index: {}", path.display()))?;
        serde_json::from_slice(&content)
            .with_context(|| format!("Failed to decode index: {}", path.display()))
    }

    /// Write through a temp file and rename, so readers never observe a
    /// half-written index.
    fn persist(&self, index: &VectorIndex) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create storage dir: {}", self.dir.display()))?;

        let path = self.index_path();
        let tmp = self.dir.join(format!("{}.tmp", INDEX_FILE));
        let bytes = serde_json::to_vec(index)?;
        fs::write(&tmp, bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to move index into place: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdocs_core::models::Chunk;
    use askdocs_core::snapshot::SnapshotEntry;
    use std::time::SystemTime;

    #[test]
    fn test_tracker_missing_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let tracker = FileTracker::new(tmp.path().join("file_tracker.txt"));
        assert!(tracker.load().is_none());
    }

    #[test]
    fn test_tracker_save_creates_parents_and_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state/file_tracker.txt");
        let tracker = FileTracker::new(&path);
        let snap = FileSnapshot::from_entries(vec![
            SnapshotEntry::new("/d/b.txt", SystemTime::UNIX_EPOCH),
            SnapshotEntry::new("/d/a.txt", SystemTime::UNIX_EPOCH),
        ]);

        tracker.save(&snap).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "/d/a.txt|0.000000000\n/d/b.txt|0.000000000"
        );
        assert_eq!(tracker.load(), Some(snap));
    }

    #[test]
    fn test_tracker_unreadable_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read as text.
        let path = tmp.path().join("file_tracker.txt");
        fs::create_dir_all(&path).unwrap();
        assert!(FileTracker::new(&path).load().is_none());
    }

    #[test]
    fn test_index_store_population_and_persist() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirIndexStore::new(tmp.path().join("storage"));
        assert!(!store.is_populated(), "missing dir");

        fs::create_dir_all(store.dir()).unwrap();
        assert!(!store.is_populated(), "empty dir");

        let chunk = Chunk {
            source: "/d/a.txt".into(),
            page: Some(2),
            chunk_index: 0,
            text: "alpha beta".to_string(),
        };
        let index = VectorIndex::from_parts("models/embedding-001", vec![chunk.clone()], vec![vec![0.5, 0.5]])
            .unwrap();
        store.persist(&index).unwrap();

        assert!(store.is_populated());
        assert!(!store.dir().join("index.json.tmp").exists());
        let loaded = store.load().unwrap();
        assert_eq!(loaded.embedding_model, "models/embedding-001");
        assert_eq!(loaded.entries[0].chunk, chunk);
        assert_eq!(loaded.entries[0].vector, vec![0.5, 0.5]);
    }

    #[test]
    fn test_index_store_corrupt_file_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirIndexStore::new(tmp.path());
        fs::write(tmp.path().join(INDEX_FILE), "{not json").unwrap();
        assert!(store.is_populated());
        let err = store.load().unwrap_err();
        assert!(format!("{:#}", err).contains("decode"));
    }
}
