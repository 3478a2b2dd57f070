//! Hosted embedding and answer-generation providers.
//!
//! Implements the [`EmbeddingProvider`] and [`AnswerProvider`] traits from
//! `askdocs-core` against two HTTP APIs:
//!
//! | Kind | Embeddings | Answers |
//! |------|-----------|---------|
//! | `gemini` | `POST /v1beta/{model}:batchEmbedContents` | `POST /v1beta/{model}:generateContent` |
//! | `openai` | `POST /v1/embeddings` | `POST /v1/chat/completions` |
//!
//! Every request carries the configured timeout. Failures are returned
//! to the caller as-is; nothing here retries.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use askdocs_core::embedding::{AnswerProvider, EmbeddingProvider};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{ProviderConfig, ProviderKind};

/// The provider pair used by the index manager and query service.
#[derive(Clone)]
pub struct Providers {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub answerer: Arc<dyn AnswerProvider>,
}

/// Build the providers selected by `config.kind`.
///
/// # Errors
///
/// Returns an error if the credential cannot be resolved or the HTTP
/// client cannot be constructed.
pub fn create_providers(config: &ProviderConfig) -> Result<Providers> {
    let api = HttpApi::new(config)?;
    let embedding_model = embedding_model_id(config);
    let llm_model = config.llm_model().to_string();

    Ok(match config.kind {
        ProviderKind::Gemini => Providers {
            embedder: Arc::new(GeminiEmbedder {
                api: api.clone(),
                model: embedding_model,
            }),
            answerer: Arc::new(GeminiChat {
                api,
                model: qualify_gemini_model(&llm_model),
            }),
        },
        ProviderKind::OpenAI => Providers {
            embedder: Arc::new(OpenAIEmbedder {
                api: api.clone(),
                model: embedding_model,
            }),
            answerer: Arc::new(OpenAIChat {
                api,
                model: llm_model,
            }),
        },
    })
}

/// Model name the configured embedder reports, and so the name stamped on
/// every index it builds.
pub fn embedding_model_id(config: &ProviderConfig) -> String {
    match config.kind {
        ProviderKind::Gemini => qualify_gemini_model(config.embedding_model()),
        ProviderKind::OpenAI => config.embedding_model().to_string(),
    }
}

/// Gemini model paths are addressed as `models/<name>`.
fn qualify_gemini_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

#[derive(Clone)]
enum Auth {
    GoogleApiKey(String),
    Bearer(String),
}

/// Shared HTTP plumbing: client with timeout, origin, credential.
#[derive(Clone)]
struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    auth: Auth,
    label: &'static str,
}

impl HttpApi {
    fn new(config: &ProviderConfig) -> Result<Self> {
        let key = config.resolve_api_key()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let (auth, label) = match config.kind {
            ProviderKind::Gemini => (Auth::GoogleApiKey(key), "Gemini"),
            ProviderKind::OpenAI => (Auth::Bearer(key), "OpenAI"),
        };
        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            auth,
            label,
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.post(&url).json(body);
        let request = match &self.auth {
            Auth::GoogleApiKey(key) => request.header("x-goog-api-key", key),
            Auth::Bearer(key) => request.bearer_auth(key),
        };

        let response = request
            .send()
            .await
            .with_context(|| format!("{} request to {} failed", self.label, url))?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("{} API error {}: {}", self.label, status, body_text);
        }
        Ok(response.json().await?)
    }
}

// ============ Gemini ============

pub struct GeminiEmbedder {
    api: HttpApi,
    model: String,
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let requests: Vec<Value> = texts
            .iter()
            .map(|t| json!({ "model": self.model, "content": { "parts": [{ "text": t }] } }))
            .collect();
        let body = json!({ "requests": requests });
        let path = format!("/v1beta/{}:batchEmbedContents", self.model);
        let json = self.api.post_json(&path, &body).await?;
        let vectors = parse_gemini_embeddings(&json)?;
        ensure_count(texts.len(), vectors.len())?;
        Ok(vectors)
    }
}

pub struct GeminiChat {
    api: HttpApi,
    model: String,
}

#[async_trait]
impl AnswerProvider for GeminiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });
        let path = format!("/v1beta/{}:generateContent", self.model);
        let json = self.api.post_json(&path, &body).await?;
        parse_gemini_answer(&json)
    }
}

/// Extract `embeddings[].values` in request order.
fn parse_gemini_embeddings(json: &Value) -> Result<Vec<Vec<f32>>> {
    let items = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid Gemini response: missing embeddings array"))?;

    items
        .iter()
        .map(|item| {
            item.get("values")
                .and_then(|v| v.as_array())
                .map(|values| to_f32_vec(values))
                .ok_or_else(|| anyhow!("Invalid Gemini response: missing embedding values"))
        })
        .collect()
}

/// Join the text parts of the first candidate.
fn parse_gemini_answer(json: &Value) -> Result<String> {
    let candidate = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| match json.pointer("/promptFeedback/blockReason") {
            Some(reason) => anyhow!("Gemini returned no answer (blocked: {})", reason),
            None => anyhow!("Invalid Gemini response: no candidates"),
        })?;

    let parts = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow!("Invalid Gemini response: candidate has no content"))?;

    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join(""))
}

// ============ OpenAI ============

pub struct OpenAIEmbedder {
    api: HttpApi,
    model: String,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = json!({ "model": self.model, "input": texts });
        let json = self.api.post_json("/v1/embeddings", &body).await?;
        let vectors = parse_openai_embeddings(&json)?;
        ensure_count(texts.len(), vectors.len())?;
        Ok(vectors)
    }
}

pub struct OpenAIChat {
    api: HttpApi,
    model: String,
}

#[async_trait]
impl AnswerProvider for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let json = self.api.post_json("/v1/chat/completions", &body).await?;
        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_embeddings(json: &Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .unwrap_or(position as u64);
        indexed.push((index, to_f32_vec(embedding)));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

fn to_f32_vec(values: &[Value]) -> Vec<f32> {
    values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect()
}

fn ensure_count(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        bail!("provider returned {} embeddings for {} inputs", got, expected);
    }
    Ok(())
}
