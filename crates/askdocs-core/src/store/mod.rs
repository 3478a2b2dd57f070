//! Persistence seams for the index manager.
//!
//! Two small stores back the incremental rebuild logic:
//!
//! | Trait | Holds | Default backend (app crate) |
//! |-------|-------|-----------------------------|
//! | [`TrackerStore`] | the last [`FileSnapshot`] an index was built from | a text file, one `path|mtime` per line |
//! | [`IndexStore`] | the persisted [`VectorIndex`] | a storage directory |
//!
//! The in-memory implementations in [`memory`] let tests drive the index
//! manager without touching the filesystem.

pub mod memory;

use std::sync::Arc;

use anyhow::Result;

use crate::models::VectorIndex;
use crate::snapshot::FileSnapshot;

/// Storage for the snapshot recorded after the last successful build.
pub trait TrackerStore: Send + Sync {
    /// Returns the recorded snapshot, or `None` when there is no usable
    /// record. An unreadable record counts as absent.
    fn load(&self) -> Option<FileSnapshot>;

    /// Overwrite the record.
    fn save(&self, snapshot: &FileSnapshot) -> std::io::Result<()>;
}

/// Storage for the persisted vector index.
pub trait IndexStore: Send + Sync {
    /// True when the backing location exists and holds anything at all.
    fn is_populated(&self) -> bool;

    fn load(&self) -> Result<VectorIndex>;

    fn persist(&self, index: &VectorIndex) -> Result<()>;
}

impl<T: TrackerStore + ?Sized> TrackerStore for Arc<T> {
    fn load(&self) -> Option<FileSnapshot> {
        (**self).load()
    }

    fn save(&self, snapshot: &FileSnapshot) -> std::io::Result<()> {
        (**self).save(snapshot)
    }
}

impl<T: IndexStore + ?Sized> IndexStore for Arc<T> {
    fn is_populated(&self) -> bool {
        (**self).is_populated()
    }

    fn load(&self) -> Result<VectorIndex> {
        (**self).load()
    }

    fn persist(&self, index: &VectorIndex) -> Result<()> {
        (**self).persist(index)
    }
}
