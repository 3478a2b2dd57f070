//! Index maintenance: freshness checks and resilient rebuilds.
//!
//! The [`IndexManager`] decides between reusing the persisted index and
//! rebuilding it from the document root.
//!
//! ```text
//!            ┌──────── store populated, tracker matches ────────┐
//!            ▼                                                  │
//!   load_or_build ──▶ Fresh ──▶ load persisted index ──▶ return │
//!            │                                                  │
//!            └──▶ Stale ──▶ scan ▶ load ▶ chunk ▶ embed ▶ persist ▶ save tracker
//! ```
//!
//! The tracker record is written only after the index is persisted, so a
//! failed build never leaves a record describing an index that does not
//! exist. The baseline snapshot is taken from the same scan the build reads,
//! so edits made while a build runs are picked up by the next freshness check.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use askdocs_core::chunk::chunk_documents;
use askdocs_core::embedding::EmbeddingProvider;
use askdocs_core::models::{Chunk, VectorIndex};
use askdocs_core::store::{IndexStore, TrackerStore};
use tracing::{debug, info, warn};

use crate::config::{ChunkingConfig, Config};
use crate::error::{Error, Result};
use crate::loader::{DocumentLoader, LoadOutcome, SkipReason};
use crate::provider::embedding_model_id;
use crate::snapshot::{self, absolute_root, scan_tree, snapshot_of};
use crate::store::{DirIndexStore, FileTracker};

/// Why an index must be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// Storage directory missing or empty.
    StorageEmpty,
    /// No tracker record from a previous build.
    NoTrackerRecord,
    /// Files were added, removed, or modified since the last build.
    FilesChanged,
    /// The persisted index was embedded with a different model.
    ModelChanged,
    /// The persisted index could not be decoded.
    IndexUnreadable,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::StorageEmpty => write!(f, "storage is empty"),
            StaleReason::NoTrackerRecord => write!(f, "no file tracker record"),
            StaleReason::FilesChanged => write!(f, "documents changed"),
            StaleReason::ModelChanged => write!(f, "embedding model changed"),
            StaleReason::IndexUnreadable => write!(f, "persisted index unreadable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Fresh,
    Stale(StaleReason),
}

/// What a rebuild read and produced.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub files_seen: usize,
    pub files_loaded: usize,
    pub skipped: Vec<(PathBuf, SkipReason)>,
    pub empty_folders: Vec<PathBuf>,
    pub chunks: usize,
}

#[derive(Debug, Clone)]
pub enum IndexOrigin {
    /// Reused from storage; no embedding calls were made.
    Loaded,
    Built(BuildReport),
}

#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub index: VectorIndex,
    pub origin: IndexOrigin,
}

pub struct IndexManager {
    data_dir: PathBuf,
    chunking: ChunkingConfig,
    batch_size: usize,
    loader: DocumentLoader,
    embedder: Arc<dyn EmbeddingProvider>,
    index_store: Box<dyn IndexStore>,
    tracker: Box<dyn TrackerStore>,
}

impl IndexManager {
    pub fn new(
        config: &Config,
        embedder: Arc<dyn EmbeddingProvider>,
        index_store: Box<dyn IndexStore>,
        tracker: Box<dyn TrackerStore>,
    ) -> Self {
        Self {
            data_dir: absolute_root(&config.paths.data_dir),
            chunking: config.chunking.clone(),
            batch_size: config.provider.batch_size.max(1),
            loader: DocumentLoader::from_config(&config.loader),
            embedder,
            index_store,
            tracker,
        }
    }

    /// Manager over the configured storage directory and tracker file.
    pub fn from_config(config: &Config, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(
            config,
            embedder,
            Box::new(DirIndexStore::new(&config.paths.storage_dir)),
            Box::new(FileTracker::new(&config.paths.tracker_path)),
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Freshness of the persisted index. Reads storage and the tracker
    /// record; writes nothing.
    pub fn state(&self) -> IndexState {
        freshness(&self.data_dir, self.index_store.as_ref(), self.tracker.as_ref())
    }

    /// Return the persisted index when fresh, otherwise rebuild it.
    ///
    /// A persisted index that fails to decode, or that was embedded with a
    /// different model than the configured one, is rebuilt.
    pub async fn load_or_build(&self) -> Result<LoadedIndex> {
        match self.state() {
            IndexState::Fresh => match self.index_store.load() {
                Ok(index) if index.embedding_model == self.embedder.model_name() => {
                    info!(chunks = index.len(), "loading existing index");
                    return Ok(LoadedIndex {
                        index,
                        origin: IndexOrigin::Loaded,
                    });
                }
                Ok(index) => warn!(
                    persisted = %index.embedding_model,
                    configured = %self.embedder.model_name(),
                    "embedding model changed; rebuilding index"
                ),
                Err(e) => warn!(error = %format!("{:#}", e), "persisted index unusable; rebuilding"),
            },
            IndexState::Stale(reason) => info!(%reason, "changes detected; rebuilding index"),
        }
        self.rebuild().await
    }

    /// Rebuild from the document root regardless of freshness.
    pub async fn rebuild(&self) -> Result<LoadedIndex> {
        let scan = scan_tree(&self.data_dir);
        let baseline = snapshot_of(&scan);

        let mut report = BuildReport {
            files_seen: scan.files.len(),
            empty_folders: scan.empty_folders.clone(),
            ..Default::default()
        };
        for folder in &scan.empty_folders {
            debug!(folder = %folder.display(), "skipping empty folder");
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        for (path, _) in &scan.files {
            match self.loader.load(path) {
                LoadOutcome::Loaded(docs) => {
                    report.files_loaded += 1;
                    chunks.extend(chunk_documents(
                        &docs,
                        self.chunking.chunk_size,
                        self.chunking.chunk_overlap,
                    ));
                }
                LoadOutcome::Skipped(reason) => report.skipped.push((path.clone(), reason)),
            }
        }

        if chunks.is_empty() {
            return Err(Error::EmptyCorpus {
                root: self.data_dir.clone(),
            });
        }
        report.chunks = chunks.len();
        info!(chunks = chunks.len(), files = report.files_loaded, "embedding corpus");

        let vectors = self.embed_chunks(&chunks).await?;
        let index = VectorIndex::from_parts(self.embedder.model_name(), chunks, vectors)
            .map_err(Error::Provider)?;

        self.index_store.persist(&index).map_err(Error::Storage)?;
        snapshot::record(&baseline, self.tracker.as_ref()).map_err(Error::Tracker)?;
        info!(
            chunks = index.len(),
            skipped = report.skipped.len(),
            "index built successfully"
        );

        Ok(LoadedIndex {
            index,
            origin: IndexOrigin::Built(report),
        })
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let batch_vectors = self.embedder.embed(&texts).await.map_err(Error::Provider)?;
            vectors.extend(batch_vectors);
        }
        Ok(vectors)
    }
}

/// Freshness of the configured storage, without constructing providers.
///
/// Beyond the tracker comparison, a fresh index must also decode and carry
/// the configured embedding model, the same conditions
/// [`IndexManager::load_or_build`] checks before reusing it.
pub fn state_of(config: &Config) -> IndexState {
    let index_store = DirIndexStore::new(&config.paths.storage_dir);
    let state = freshness(
        &absolute_root(&config.paths.data_dir),
        &index_store,
        &FileTracker::new(&config.paths.tracker_path),
    );
    if state != IndexState::Fresh {
        return state;
    }
    match index_store.load() {
        Ok(index) if index.embedding_model == embedding_model_id(&config.provider) => {
            IndexState::Fresh
        }
        Ok(index) => {
            debug!(persisted = %index.embedding_model, "persisted index uses another model");
            IndexState::Stale(StaleReason::ModelChanged)
        }
        Err(e) => {
            debug!(error = %format!("{:#}", e), "persisted index does not decode");
            IndexState::Stale(StaleReason::IndexUnreadable)
        }
    }
}

fn freshness(data_dir: &Path, index_store: &dyn IndexStore, tracker: &dyn TrackerStore) -> IndexState {
    if !index_store.is_populated() {
        return IndexState::Stale(StaleReason::StorageEmpty);
    }
    if tracker.load().is_none() {
        return IndexState::Stale(StaleReason::NoTrackerRecord);
    }
    if snapshot::has_changed(data_dir, tracker) {
        return IndexState::Stale(StaleReason::FilesChanged);
    }
    IndexState::Fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use askdocs_core::store::memory::{InMemoryIndexStore, InMemoryTracker};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        fn model_name(&self) -> &str {
            "test-embed"
        }

        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("quota exceeded");
            }
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    fn manager_for(dir: &std::path::Path, fail: bool) -> (IndexManager, Arc<CountingEmbedder>) {
        let mut config = Config::default();
        config.paths.data_dir = dir.to_path_buf();
        config.provider.batch_size = 2;
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
            fail,
        });
        let manager = IndexManager::new(
            &config,
            embedder.clone(),
            Box::new(InMemoryIndexStore::new()),
            Box::new(InMemoryTracker::new()),
        );
        (manager, embedder)
    }

    #[tokio::test]
    async fn test_build_batches_embedding_calls() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs::write(tmp.path().join(name), format!("contents of {}", name)).unwrap();
        }
        let (manager, embedder) = manager_for(tmp.path(), false);

        let loaded = manager.load_or_build().await.unwrap();
        assert_eq!(loaded.index.len(), 3);
        // batch_size = 2 over three chunks.
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
        match loaded.origin {
            IndexOrigin::Built(report) => {
                assert_eq!(report.files_seen, 3);
                assert_eq!(report.files_loaded, 3);
                assert_eq!(report.chunks, 3);
            }
            IndexOrigin::Loaded => panic!("expected a build"),
        }
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
        let (manager, _) = manager_for(tmp.path(), false);

        assert_eq!(manager.state(), IndexState::Stale(StaleReason::StorageEmpty));
        manager.load_or_build().await.unwrap();
        assert_eq!(manager.state(), IndexState::Fresh);

        fs::write(tmp.path().join("b.txt"), "beta").unwrap();
        assert_eq!(manager.state(), IndexState::Stale(StaleReason::FilesChanged));
    }

    #[tokio::test]
    async fn test_chunk_order_follows_path_order() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("z.txt"), "zulu").unwrap();
        fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
        fs::write(tmp.path().join("sub/m.txt"), "mike").unwrap();
        let (manager, _) = manager_for(tmp.path(), false);

        let loaded = manager.rebuild().await.unwrap();
        let texts: Vec<&str> = loaded
            .index
            .entries
            .iter()
            .map(|e| e.chunk.text.as_str())
            .collect();
        assert_eq!(texts, vec!["alpha", "mike", "zulu"]);
    }

    #[tokio::test]
    async fn test_empty_root_is_empty_corpus() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("nothing_here")).unwrap();
        let (manager, embedder) = manager_for(tmp.path(), false);

        let err = manager.load_or_build().await.unwrap_err();
        assert!(matches!(err, Error::EmptyCorpus { .. }));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
        let (manager, _) = manager_for(tmp.path(), true);

        let err = manager.load_or_build().await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(manager.state(), IndexState::Stale(StaleReason::StorageEmpty));
    }
}
