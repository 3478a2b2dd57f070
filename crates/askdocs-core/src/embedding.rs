//! Provider traits and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] and [`AnswerProvider`] traits that the
//! hosted model backends implement, plus the similarity function used for
//! retrieval over a [`VectorIndex`](crate::models::VectorIndex).
//!
//! Concrete providers (Gemini, OpenAI) live in the `askdocs` app crate.
//! Tests substitute in-process fakes.

use anyhow::Result;
use async_trait::async_trait;

/// A backend that turns text into embedding vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"models/embedding-001"`).
    ///
    /// Persisted with the index; a mismatch on load forces a rebuild.
    fn model_name(&self) -> &str;

    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// A backend that generates a plain-text answer for a prompt.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"models/gemini-1.5-flash"`).
    fn model_name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Relevance score used for retrieval: the cosine of the angle between a
/// query embedding and a chunk embedding.
///
/// Sums are accumulated in `f64` and the result is clamped to `[-1.0, 1.0]`.
/// Mismatched lengths, empty input, or a zero vector on either side score
/// `0.0`, which ranks below any chunk sharing a direction with the query.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, sq_a, sq_b) = a
        .iter()
        .zip(b)
        .fold((0.0f64, 0.0f64, 0.0f64), |(d, na, nb), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (d + x * y, na + x * x, nb + y * y)
        });

    let magnitude = (sq_a * sq_b).sqrt();
    if magnitude <= f64::from(f32::EPSILON) {
        return 0.0;
    }
    (dot / magnitude).clamp(-1.0, 1.0) as f32
}
