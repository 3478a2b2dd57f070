//! Retrieval-augmented question answering.
//!
//! [`QueryService::answer`] makes sure the index is current, embeds the
//! question, picks the `top_k` most similar chunks, and asks the answer
//! provider to respond from that context alone.

use std::path::PathBuf;
use std::sync::Arc;

use askdocs_core::embedding::{AnswerProvider, EmbeddingProvider};
use askdocs_core::models::ScoredChunk;
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::index::{IndexManager, IndexOrigin};

/// Prompt sent to the answer provider. `{context}` and `{question}` are
/// substituted.
pub const QA_TEMPLATE: &str = "Context information is below.\n\
---------------------\n\
{context}\n\
---------------------\n\
Given the context information and not prior knowledge, answer the query.\n\
Query: {question}\n\
Answer: ";

/// A chunk the answer was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub source: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

pub struct QueryService {
    manager: IndexManager,
    embedder: Arc<dyn EmbeddingProvider>,
    answerer: Arc<dyn AnswerProvider>,
    top_k: usize,
}

impl QueryService {
    pub fn new(
        config: &Config,
        manager: IndexManager,
        embedder: Arc<dyn EmbeddingProvider>,
        answerer: Arc<dyn AnswerProvider>,
    ) -> Self {
        Self {
            manager,
            embedder,
            answerer,
            top_k: config.retrieval.top_k.max(1),
        }
    }

    pub fn manager(&self) -> &IndexManager {
        &self.manager
    }

    /// Answer `question` from the indexed documents.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyQuestion`] for blank input.
    /// - [`Error::EmptyCorpus`] when no index can be built.
    /// - [`Error::Provider`] when embedding or generation fails.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::EmptyQuestion);
        }

        let loaded = self.manager.load_or_build().await?;
        if let IndexOrigin::Built(report) = &loaded.origin {
            info!(chunks = report.chunks, "index rebuilt before answering");
        }

        let query_vec = self
            .embedder
            .embed(&[question.to_string()])
            .await
            .map_err(Error::Provider)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Provider(anyhow::anyhow!("Empty embedding response")))?;

        let hits = loaded.index.search(&query_vec, self.top_k);
        let prompt = render_prompt(question, &hits);
        let text = self
            .answerer
            .complete(&prompt)
            .await
            .map_err(Error::Provider)?;

        Ok(Answer {
            text: text.trim().to_string(),
            sources: hits
                .iter()
                .map(|h| SourceRef {
                    source: h.chunk.source.clone(),
                    page: h.chunk.page,
                    score: h.score,
                })
                .collect(),
        })
    }
}

/// Fill [`QA_TEMPLATE`] with the retrieved chunks, each preceded by its
/// source path (and page, when known).
pub fn render_prompt(question: &str, hits: &[ScoredChunk<'_>]) -> String {
    let context = hits
        .iter()
        .map(|h| match h.chunk.page {
            Some(page) => format!(
                "source: {} (page {})\n\n{}",
                h.chunk.source.display(),
                page,
                h.chunk.text
            ),
            None => format!("source: {}\n\n{}", h.chunk.source.display(), h.chunk.text),
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    QA_TEMPLATE
        .replace("{context}", &context)
        .replace("{question}", question)
}
