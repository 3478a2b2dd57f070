//! Shared fakes for integration tests: deterministic providers and a
//! temp workspace with `data/`, `storage/`, and a tracker path.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use askdocs::config::{Config, ProviderKind};
use askdocs_core::embedding::{AnswerProvider, EmbeddingProvider};
use askdocs_core::models::VectorIndex;
use askdocs_core::snapshot::FileSnapshot;
use askdocs_core::store::memory::{InMemoryIndexStore, InMemoryTracker};
use askdocs_core::store::{IndexStore, TrackerStore};
use async_trait::async_trait;
use tempfile::TempDir;

const DIMS: usize = 256;

/// Bag-of-words embedder: each lowercase alphanumeric token increments
/// one hashed bucket. Texts sharing words score higher under cosine.
pub struct FakeEmbedder {
    model: String,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeEmbedder {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn fnv1a(token: &str) -> usize {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in token.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % DIMS as u64) as usize
}

pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; DIMS];
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        v[fnv1a(&token.to_lowercase())] += 1.0;
    }
    v
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("embedding quota exceeded");
        }
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }
}

/// Answerer that records every prompt and replies with a fixed string.
pub struct FakeAnswerer {
    pub prompts: Mutex<Vec<String>>,
    reply: String,
}

impl FakeAnswerer {
    pub fn new(reply: &str) -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            reply: reply.to_string(),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AnswerProvider for FakeAnswerer {
    fn model_name(&self) -> &str {
        "fake-llm"
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Index store whose writes fail while `fail` is set. Reads pass through.
pub struct FlakyIndexStore {
    pub inner: Arc<InMemoryIndexStore>,
    pub fail: AtomicBool,
}

impl FlakyIndexStore {
    pub fn new(inner: Arc<InMemoryIndexStore>) -> Self {
        Self {
            inner,
            fail: AtomicBool::new(false),
        }
    }
}

impl IndexStore for FlakyIndexStore {
    fn is_populated(&self) -> bool {
        self.inner.is_populated()
    }

    fn load(&self) -> anyhow::Result<VectorIndex> {
        self.inner.load()
    }

    fn persist(&self, index: &VectorIndex) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("storage volume is read-only");
        }
        self.inner.persist(index)
    }
}

/// Tracker whose saves fail while `fail` is set. Loads pass through.
pub struct FlakyTracker {
    pub inner: Arc<InMemoryTracker>,
    pub fail: AtomicBool,
}

impl FlakyTracker {
    pub fn new(inner: Arc<InMemoryTracker>) -> Self {
        Self {
            inner,
            fail: AtomicBool::new(false),
        }
    }
}

impl TrackerStore for FlakyTracker {
    fn load(&self) -> Option<FileSnapshot> {
        self.inner.load()
    }

    fn save(&self, snapshot: &FileSnapshot) -> std::io::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("disk full"));
        }
        self.inner.save(snapshot)
    }
}

/// Temp workspace laid out like a default installation.
pub struct Workspace {
    pub tmp: TempDir,
    pub config: Config,
}

impl Workspace {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("data")).unwrap();

        let mut config = Config::default();
        config.paths.data_dir = root.join("data");
        config.paths.storage_dir = root.join("storage");
        config.paths.tracker_path = root.join("file_tracker.txt");
        // Matches the model name of `FakeEmbedder::new("fake-embed")`.
        config.provider.kind = ProviderKind::OpenAI;
        config.provider.embedding_model = Some("fake-embed".to_string());
        Self { tmp, config }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.config.paths.data_dir.clone()
    }

    /// Write `contents` to `data/<rel>`, creating parent folders.
    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.data_dir().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }
}

/// Minimal `.docx`: a zip holding `word/document.xml` with one paragraph
/// per entry of `paragraphs`.
pub fn docx_with(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
        body
    );
    zip_with(&[("word/document.xml", xml.as_str())])
}

/// Minimal `.pptx` with one slide per entry of `slides`.
pub fn pptx_with(slides: &[&str]) -> Vec<u8> {
    let xml: Vec<(String, String)> = slides
        .iter()
        .enumerate()
        .map(|(i, text)| {
            (
                format!("ppt/slides/slide{}.xml", i + 1),
                format!(
                    "<?xml version=\"1.0\"?><p:sld xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\" xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>",
                    text
                ),
            )
        })
        .collect();
    let entries: Vec<(&str, &str)> = xml.iter().map(|(n, x)| (n.as_str(), x.as_str())).collect();
    zip_with(&entries)
}

fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        for (name, contents) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}
