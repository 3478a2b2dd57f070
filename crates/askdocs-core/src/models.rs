//! Core data models used throughout askdocs.
//!
//! These types represent the documents, chunks, and vector index that flow
//! through the build and query pipeline.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::embedding::cosine_similarity;

/// Normalized text extracted from one source file.
///
/// PDFs produce one document per page; text and Office files produce one
/// document per file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: PathBuf,
    /// 1-based page number for paged formats.
    pub page: Option<u32>,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page: None,
            text: text.into(),
        }
    }

    pub fn with_page(source: impl Into<PathBuf>, page: u32, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page: Some(page),
            text: text.into(),
        }
    }

    /// True when the text holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A bounded slice of a [`Document`]'s text, prepared for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub source: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Position within the parent document, contiguous from 0.
    pub chunk_index: usize,
    pub text: String,
}

/// A chunk paired with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// The persisted retrieval index.
///
/// Entries keep build order: files in path order, pages in page order,
/// chunks in sequence order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    /// Embedding model that produced every vector in this index.
    pub embedding_model: String,
    pub dims: usize,
    pub built_at: DateTime<Utc>,
    pub entries: Vec<IndexedChunk>,
}

/// A retrieval hit borrowed from a [`VectorIndex`].
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f32,
}

impl VectorIndex {
    /// Pair chunks with their vectors.
    ///
    /// Fails when the counts differ or the vectors disagree on
    /// dimensionality; both mean the provider returned a malformed batch.
    pub fn from_parts(
        embedding_model: impl Into<String>,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.len() != vectors.len() {
            bail!(
                "embedding count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }

        let dims = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().position(|v| v.len() != dims) {
            bail!(
                "embedding {} has {} dimensions, expected {}",
                bad,
                vectors[bad].len(),
                dims
            );
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedChunk { chunk, vector })
            .collect();

        Ok(Self {
            embedding_model: embedding_model.into(),
            dims,
            built_at: Utc::now(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the `top_k` entries most similar to `query`, best first.
    ///
    /// Ties keep index order.
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<ScoredChunk<'_>> {
        let mut hits: Vec<ScoredChunk<'_>> = self
            .entries
            .iter()
            .map(|e| ScoredChunk {
                chunk: &e.chunk,
                score: cosine_similarity(query, &e.vector),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        hits
    }
}
