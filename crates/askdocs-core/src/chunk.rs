//! Overlapping token-window chunker.
//!
//! Splits document text into [`Chunk`]s of at most `chunk_size` tokens,
//! where consecutive chunks of the same document share exactly `overlap`
//! tokens. Each chunk's text is the verbatim slice of the document from its
//! first token to its last, so line breaks inside a chunk survive.
//!
//! # Tokens
//!
//! - A run of non-whitespace characters is a token.
//! - Runs longer than [`MAX_TOKEN_CHARS`] are cut into pieces of that length.
//! - Each CJK ideograph, kana, hangul syllable, or fullwidth form is a token
//!   of its own, since those scripts do not separate words with spaces.
//!
//! A chunk therefore never exceeds `chunk_size * MAX_TOKEN_CHARS` characters,
//! whatever the input looks like (minified text, base64, unspaced scripts).
//!
//! # Algorithm
//!
//! 1. Locate the byte span of every token in the text.
//! 2. Emit a window covering tokens `[start, start + chunk_size)`.
//! 3. Advance `start` by `chunk_size - overlap` and repeat until a window
//!    reaches the final token.
//!
//! A document with `L` tokens yields no chunks when `L == 0`, one chunk
//! when `L <= chunk_size`, and `ceil((L - overlap) / (chunk_size - overlap))`
//! chunks otherwise.
//!
//! # Example
//!
//! ```rust
//! use askdocs_core::chunk::chunk_text;
//!
//! let pieces = chunk_text("one two three four five", 3, 1);
//! assert_eq!(pieces, vec!["one two three", "three four five"]);
//! ```

use crate::models::{Chunk, Document};

/// Longest run of characters counted as one token.
pub const MAX_TOKEN_CHARS: usize = 32;

/// Scripts written without spaces between words.
fn is_unspaced_script(c: char) -> bool {
    matches!(
        c as u32,
        0x3040..=0x30FF        // hiragana, katakana
            | 0x3400..=0x4DBF  // CJK extension A
            | 0x4E00..=0x9FFF  // CJK unified ideographs
            | 0xAC00..=0xD7AF  // hangul syllables
            | 0xF900..=0xFAFF  // CJK compatibility ideographs
            | 0xFF00..=0xFFEF  // fullwidth forms
            | 0x20000..=0x2FA1F
    )
}

/// Byte ranges of tokens, in text order.
fn token_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let mut run_chars = 0;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() || is_unspaced_script(c) {
            if let Some(s) = start.take() {
                spans.push((s, i));
            }
            if !c.is_whitespace() {
                spans.push((i, i + c.len_utf8()));
            }
            continue;
        }
        if run_chars == MAX_TOKEN_CHARS {
            if let Some(s) = start.take() {
                spans.push((s, i));
            }
        }
        if start.is_none() {
            start = Some(i);
            run_chars = 0;
        }
        run_chars += 1;
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

/// Split `text` into overlapping windows of at most `chunk_size` tokens.
///
/// An `overlap` of `chunk_size` or more is clamped to `chunk_size - 1` so
/// the window always advances. A `chunk_size` of zero yields nothing.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<&str> {
    if chunk_size == 0 {
        return Vec::new();
    }
    let overlap = overlap.min(chunk_size - 1);
    let step = chunk_size - overlap;

    let spans = token_spans(text);
    let mut pieces = Vec::new();
    let mut start = 0;
    while start < spans.len() {
        let end = (start + chunk_size).min(spans.len());
        pieces.push(&text[spans[start].0..spans[end - 1].1]);
        if end == spans.len() {
            break;
        }
        start += step;
    }
    pieces
}

/// Chunk one document, tagging every chunk with its provenance.
pub fn chunk_document(document: &Document, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    chunk_text(&document.text, chunk_size, overlap)
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| Chunk {
            source: document.source.clone(),
            page: document.page,
            chunk_index,
            text: text.to_string(),
        })
        .collect()
}

/// Chunk a sequence of documents, preserving document order.
pub fn chunk_documents(documents: &[Document], chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    documents
        .iter()
        .flat_map(|d| chunk_document(d, chunk_size, overlap))
        .collect()
}
