//! # askdocs CLI
//!
//! ## Usage
//!
//! ```bash
//! askdocs [--config ./askdocs.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askdocs ask "<question>"` | Answer a question, rebuilding the index first if documents changed |
//! | `askdocs index [--force]` | Bring the index up to date (or rebuild unconditionally) |
//! | `askdocs status` | Report whether the persisted index is current |
//! | `askdocs serve` | Start the HTTP question form |
//!
//! Without `--config`, built-in defaults are used: documents under `./data`,
//! the index under `./storage`, and the tracker record in
//! `./file_tracker.txt`. A `.env` file in the working directory is read
//! before the configuration is resolved.

use std::path::PathBuf;

use anyhow::Context;
use askdocs::config::{self, Config};
use askdocs::index::{self, BuildReport, IndexManager, IndexOrigin, IndexState};
use askdocs::provider::create_providers;
use askdocs::query::QueryService;
use askdocs::server;
use askdocs::store::DirIndexStore;
use askdocs_core::store::IndexStore;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Ask questions about a folder of documents.
#[derive(Parser)]
#[command(
    name = "askdocs",
    about = "Answer questions from a folder of PDFs, Office documents, and text files",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question from the indexed documents.
    ///
    /// The index is rebuilt first when documents were added, removed, or
    /// modified since the last build.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Build the index if it is stale.
    Index {
        /// Rebuild even when the index is current.
        #[arg(long)]
        force: bool,
    },

    /// Show whether the persisted index matches the documents on disk.
    ///
    /// Makes no provider calls and needs no API key.
    Status,

    /// Start the HTTP server.
    Serve {
        /// Override `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Ask { question } => {
            let service = build_service(&cfg)?;
            let answer = service.answer(&question).await?;
            println!("{}", answer.text);
            if !answer.sources.is_empty() {
                println!();
                println!("sources:");
                for s in &answer.sources {
                    match s.page {
                        Some(page) => println!(
                            "  {} (page {})  score {:.3}",
                            s.source.display(),
                            page,
                            s.score
                        ),
                        None => println!("  {}  score {:.3}", s.source.display(), s.score),
                    }
                }
            }
        }
        Commands::Index { force } => {
            let providers = create_providers(&cfg.provider)?;
            let manager = IndexManager::from_config(&cfg, providers.embedder);
            let loaded = if force {
                manager.rebuild().await?
            } else {
                manager.load_or_build().await?
            };
            match loaded.origin {
                IndexOrigin::Loaded => {
                    println!("index is up to date ({} chunks)", loaded.index.len());
                }
                IndexOrigin::Built(report) => print_report(&report),
            }
        }
        Commands::Status => run_status(&cfg),
        Commands::Serve { bind } => {
            let service = build_service(&cfg)?;
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            server::run_server(service, &bind).await?;
        }
    }

    Ok(())
}

fn build_service(cfg: &Config) -> anyhow::Result<QueryService> {
    let providers = create_providers(&cfg.provider).context("Failed to configure provider")?;
    let manager = IndexManager::from_config(cfg, providers.embedder.clone());
    Ok(QueryService::new(
        cfg,
        manager,
        providers.embedder,
        providers.answerer,
    ))
}

fn print_report(report: &BuildReport) {
    println!("index");
    println!("  files seen:    {}", report.files_seen);
    println!("  files loaded:  {}", report.files_loaded);
    println!("  files skipped: {}", report.skipped.len());
    for (path, reason) in &report.skipped {
        println!("    {}: {}", path.display(), reason);
    }
    if !report.empty_folders.is_empty() {
        println!("  empty folders: {}", report.empty_folders.len());
    }
    println!("  chunks:        {}", report.chunks);
    println!("ok");
}

fn run_status(cfg: &Config) {
    let state = index::state_of(cfg);
    println!("data dir:   {}", cfg.paths.data_dir.display());
    println!("storage:    {}", cfg.paths.storage_dir.display());
    println!("tracker:    {}", cfg.paths.tracker_path.display());
    match state {
        IndexState::Fresh => println!("state:      fresh"),
        IndexState::Stale(reason) => println!("state:      stale ({})", reason),
    }

    let store = DirIndexStore::new(&cfg.paths.storage_dir);
    if store.is_populated() {
        match store.load() {
            Ok(index) => {
                println!("model:      {}", index.embedding_model);
                println!("chunks:     {}", index.len());
                println!(
                    "built at:   {}",
                    index
                        .built_at
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M:%S %Z")
                );
            }
            Err(e) => println!("index:      unreadable ({:#})", e),
        }
    }
}
