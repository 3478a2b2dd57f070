//! # askdocs
//!
//! Ask questions about a folder of documents and get answers grounded in
//! their contents.
//!
//! askdocs walks a data directory, extracts text from PDFs, Office
//! documents, and plain-text files, chunks and embeds it with a hosted
//! model, and keeps the resulting vector index on disk. A file tracker
//! records what the index was built from, so the index is rebuilt only
//! when documents are added, removed, or modified.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  data/      │──▶│ Load + Chunk │──▶│  storage/    │
//! │ PDF/DOCX/TXT│   │   + Embed    │   │ index.json   │
//! └─────────────┘   └──────────────┘   └──────┬───────┘
//!                                             │
//!                      ┌──────────────────────┤
//!                      ▼                      ▼
//!                 ┌──────────┐          ┌──────────┐
//!                 │   CLI    │          │   HTTP   │
//!                 │ (ask)    │          │  (form)  │
//!                 └──────────┘          └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GOOGLE_API_KEY=...
//! askdocs index                        # build the index from ./data
//! askdocs ask "What should I learn first?"
//! askdocs serve                        # http://127.0.0.1:8501
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error type for indexing and answering |
//! | [`snapshot`] | Directory scans and file tracker snapshots |
//! | [`store`] | File-backed tracker and index storage |
//! | [`extract`] | PDF / DOCX / PPTX text extraction |
//! | [`loader`] | Per-file loading with skip reasons |
//! | [`provider`] | Hosted embedding and answer providers |
//! | [`index`] | Freshness checks and rebuilds |
//! | [`query`] | Retrieval-augmented answering |
//! | [`server`] | HTTP form and JSON API |

pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod loader;
pub mod provider;
pub mod query;
pub mod server;
pub mod snapshot;
pub mod store;

pub use error::{Error, Result};
