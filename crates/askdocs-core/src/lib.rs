//! # askdocs core
//!
//! I/O-free logic for askdocs: data models, file snapshots, chunking,
//! provider traits, and the persistence traits behind the index manager.
//!
//! This crate contains no tokio, reqwest, or filesystem access. The
//! `askdocs` app crate supplies the file-backed and network-backed
//! implementations; the in-memory stores in [`store::memory`] stand in
//! for them in tests.

pub mod chunk;
pub mod embedding;
pub mod models;
pub mod snapshot;
pub mod store;
