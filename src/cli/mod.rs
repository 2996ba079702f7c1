//! CLI surface — index a project once, or serve it over MCP. Grounded on
//! the teacher's `main.rs` subcommand shape, trimmed to this crate's scope
//! (spec §1 excludes a persisted on-disk index, so there is no
//! save/retrieve/init split here, only index-then-serve).

use crate::config::Settings;
use crate::indexing::{AutoIndexManager, MasterIndex};
use crate::mcp::CodeIntelligenceServer;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "codeintel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Language-aware code intelligence engine exposed over MCP")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the in-memory index over a path and report what was found
    Index {
        path: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Build the index, then serve MCP tools over stdio
    Serve {
        path: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Builds an index and manager over `path`, logging any per-file warnings.
pub async fn build_index(path: &std::path::Path, settings: &Settings) -> anyhow::Result<(Arc<MasterIndex>, Arc<AutoIndexManager>)> {
    let index = Arc::new(MasterIndex::new(num_cpus::get().min(4), settings.index.max_total_size_mb as usize * 1024 * 1024));
    let manager = Arc::new(AutoIndexManager::new(settings.performance.debounce_ms));

    let warnings = manager.start(path, settings, &index)?;
    for warning in &warnings {
        tracing::warn!(warning, "file skipped during indexing");
    }
    manager
        .wait_for_completion(std::time::Duration::from_secs(settings.performance.indexing_timeout_sec))
        .await?;

    tracing::info!(
        files = index.get_file_count(),
        symbols = index.get_symbol_count(),
        warnings = warnings.len(),
        "index build complete"
    );
    Ok((index, manager))
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Index { path, config } => {
            let settings = Settings::load(config.as_deref())?;
            let (index, _manager) = build_index(&path, &settings).await?;
            println!("files={} symbols={}", index.get_file_count(), index.get_symbol_count());
            Ok(())
        }
        Commands::Serve { path, config } => {
            let settings = Settings::load(config.as_deref())?;
            let (index, manager) = build_index(&path, &settings).await?;
            let server = CodeIntelligenceServer::new(Arc::clone(&index), manager, path.as_path());

            use rmcp::{transport::stdio, ServiceExt};
            let service = server.serve(stdio()).await?;

            tokio::select! {
                result = service.waiting() => {
                    result?;
                    match Arc::try_unwrap(index) {
                        Ok(index) => index.shutdown(),
                        Err(index) => tracing::warn!(
                            refs = Arc::strong_count(&index),
                            "index still referenced at shutdown; skipping background worker drain"
                        ),
                    }
                }
                _ = shutdown_signal() => {
                    tracing::info!("received shutdown signal, stopping MCP server");
                    std::process::exit(0);
                }
            }
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");
}
