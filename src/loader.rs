//! Per-file document loading.
//!
//! [`DocumentLoader::load`] never fails. A file that is too large,
//! unreadable, corrupt, or empty becomes [`LoadOutcome::Skipped`] with a
//! [`SkipReason`], is logged, and contributes nothing to the build.
//!
//! # Policy
//!
//! 1. Files larger than the configured limit are skipped.
//! 2. `.pdf` files are extracted page by page; blank pages are dropped.
//! 3. `.docx` / `.pptx` files are extracted from their OOXML archives.
//! 4. Everything else is read as UTF-8 text. Invalid byte sequences are
//!    dropped; a file with a NUL byte near the start, or one that is mostly
//!    invalid sequences, is treated as binary and skipped.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use askdocs_core::models::Document;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::extract;

/// Why a file contributed no documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TooLarge { size: u64, limit: u64 },
    Unreadable(String),
    PdfFailed(String),
    /// The PDF parsed but no page held any text.
    EmptyPdf,
    ExtractFailed(String),
    /// Bytes look binary rather than text.
    NotText,
    /// Text decoded but is blank.
    EmptyText,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooLarge { size, limit } => {
                write!(f, "file too large ({} bytes > {} bytes)", size, limit)
            }
            SkipReason::Unreadable(e) => write!(f, "unreadable: {}", e),
            SkipReason::PdfFailed(e) => write!(f, "failed to read PDF: {}", e),
            SkipReason::EmptyPdf => write!(f, "empty PDF"),
            SkipReason::ExtractFailed(e) => write!(f, "extraction failed: {}", e),
            SkipReason::NotText => write!(f, "not a text file"),
            SkipReason::EmptyText => write!(f, "empty text file"),
        }
    }
}

/// Result of loading one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// At least one document with non-blank text.
    Loaded(Vec<Document>),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Pdf,
    Docx,
    Pptx,
    Text,
}

impl FileKind {
    fn of(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => FileKind::Pdf,
            "docx" => FileKind::Docx,
            "pptx" => FileKind::Pptx,
            _ => FileKind::Text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentLoader {
    max_file_size: u64,
}

impl DocumentLoader {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(config.max_file_size_bytes())
    }

    /// Load `path` into documents, or explain why it was skipped.
    pub fn load(&self, path: &Path) -> LoadOutcome {
        match self.read(path) {
            Ok(docs) => {
                info!(path = %path.display(), documents = docs.len(), "loaded");
                LoadOutcome::Loaded(docs)
            }
            Err(reason) => {
                warn!(path = %path.display(), %reason, "skipping file");
                LoadOutcome::Skipped(reason)
            }
        }
    }

    fn read(&self, path: &Path) -> Result<Vec<Document>, SkipReason> {
        let size = std::fs::metadata(path)
            .map_err(|e| SkipReason::Unreadable(e.to_string()))?
            .len();
        if size > self.max_file_size {
            return Err(SkipReason::TooLarge {
                size,
                limit: self.max_file_size,
            });
        }

        let bytes = std::fs::read(path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;

        match FileKind::of(path) {
            FileKind::Pdf => {
                let pages = extract::extract_pdf_pages(&bytes)
                    .map_err(|e| SkipReason::PdfFailed(e.to_string()))?;
                let docs: Vec<Document> = pages
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| Document::with_page(path, i as u32 + 1, text))
                    .filter(|d| !d.is_blank())
                    .collect();
                if docs.is_empty() {
                    return Err(SkipReason::EmptyPdf);
                }
                Ok(docs)
            }
            FileKind::Docx => {
                let text = extract::extract_docx(&bytes)
                    .map_err(|e| SkipReason::ExtractFailed(e.to_string()))?;
                non_blank(path, text)
            }
            FileKind::Pptx => {
                let text = extract::extract_pptx(&bytes)
                    .map_err(|e| SkipReason::ExtractFailed(e.to_string()))?;
                non_blank(path, text)
            }
            FileKind::Text => {
                let text = decode_text(path, &bytes)?;
                let text = text.strip_prefix('\u{feff}').unwrap_or(&text).to_string();
                non_blank(path, text)
            }
        }
    }
}

/// Leading bytes checked for NUL when deciding whether a file is binary.
const BINARY_SNIFF_BYTES: usize = 8 * 1024;

/// Decode as UTF-8, dropping invalid sequences. Rejects files that look
/// binary: a NUL within the first [`BINARY_SNIFF_BYTES`], or more than one
/// invalid sequence per ten characters.
fn decode_text(path: &Path, bytes: &[u8]) -> Result<String, SkipReason> {
    if bytes[..bytes.len().min(BINARY_SNIFF_BYTES)].contains(&0) {
        return Err(SkipReason::NotText);
    }
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(text) => Ok(text.to_string()),
        Cow::Owned(text) => {
            let total = text.chars().count();
            let invalid = text.chars().filter(|&c| c == char::REPLACEMENT_CHARACTER).count();
            if invalid * 10 > total {
                return Err(SkipReason::NotText);
            }
            debug!(path = %path.display(), invalid, "dropped invalid UTF-8 sequences");
            Ok(text.replace(char::REPLACEMENT_CHARACTER, ""))
        }
    }
}

fn non_blank(path: &Path, text: String) -> Result<Vec<Document>, SkipReason> {
    let doc = Document::new(path, text);
    if doc.is_blank() {
        return Err(SkipReason::EmptyText);
    }
    Ok(vec![doc])
}
