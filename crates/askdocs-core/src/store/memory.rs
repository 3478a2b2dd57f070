//! In-memory [`TrackerStore`] and [`IndexStore`] implementations for tests.
//!
//! Both count writes so tests can assert how many rebuilds happened.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::{anyhow, Result};

use crate::models::VectorIndex;
use crate::snapshot::FileSnapshot;

use super::{IndexStore, TrackerStore};

/// In-memory tracker record.
#[derive(Default)]
pub struct InMemoryTracker {
    record: RwLock<Option<FileSnapshot>>,
    saves: AtomicUsize,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times [`TrackerStore::save`] has succeeded.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl TrackerStore for InMemoryTracker {
    fn load(&self) -> Option<FileSnapshot> {
        self.record.read().ok()?.clone()
    }

    fn save(&self, snapshot: &FileSnapshot) -> std::io::Result<()> {
        let mut record = self
            .record
            .write()
            .map_err(|_| std::io::Error::other("tracker lock poisoned"))?;
        *record = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory persisted index.
#[derive(Default)]
pub struct InMemoryIndexStore {
    index: RwLock<Option<VectorIndex>>,
    persists: AtomicUsize,
}

impl InMemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times [`IndexStore::persist`] has succeeded.
    pub fn persist_count(&self) -> usize {
        self.persists.load(Ordering::SeqCst)
    }
}

impl IndexStore for InMemoryIndexStore {
    fn is_populated(&self) -> bool {
        self.index.read().map(|i| i.is_some()).unwrap_or(false)
    }

    fn load(&self) -> Result<VectorIndex> {
        self.index
            .read()
            .map_err(|_| anyhow!("index lock poisoned"))?
            .clone()
            .ok_or_else(|| anyhow!("no index has been persisted"))
    }

    fn persist(&self, index: &VectorIndex) -> Result<()> {
        let mut slot = self.index.write().map_err(|_| anyhow!("index lock poisoned"))?;
        *slot = Some(index.clone());
        self.persists.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
