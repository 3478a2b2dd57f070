//! Error type for index maintenance and question answering.
//!
//! File-level read failures never appear here: the loader turns them into
//! [`SkipReason`](crate::loader::SkipReason)s and the build carries on.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Every file under the document root was skipped or produced no text.
    #[error("no valid documents found to index under {}", root.display())]
    EmptyCorpus { root: PathBuf },

    #[error("question must not be empty")]
    EmptyQuestion,

    /// Embedding or answer-generation call failed. Not retried.
    #[error("provider error: {0:#}")]
    Provider(#[source] anyhow::Error),

    /// The built index could not be persisted.
    #[error("index storage error: {0:#}")]
    Storage(#[source] anyhow::Error),

    /// The tracker record could not be written after a successful persist.
    #[error("failed to save file tracker record: {0}")]
    Tracker(#[source] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
