use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use newsdesk::cache::StalenessCache;
use newsdesk::config::AppConfig;
use newsdesk::enrich::Enricher;
use newsdesk::logging::configure_logging;
use newsdesk::orchestrator::FetchOrchestrator;
use newsdesk::web::{self, AppState};

#[derive(Parser)]
#[command(name = "newsdesk", about = "Sectioned news aggregation service")]
struct Cli {
    /// Path to the JSON section configuration
    #[arg(long, default_value = "sections.json")]
    config: String,

    /// Port to listen on (the PORT environment variable takes precedence)
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// SQLite file backing the shared cache
    #[arg(long, default_value = "newsdesk.db")]
    database: String,

    /// Skip the persistent cache and run with the in-process cache only
    #[arg(long)]
    no_persistent_cache: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();
    let cli = Cli::parse();

    let config = Arc::new(AppConfig::load(&cli.config)?);
    info!("Loaded {} sections from {}", config.sections.len(), cli.config);

    let cache = if cli.no_persistent_cache {
        Arc::new(StalenessCache::in_memory())
    } else {
        Arc::new(StalenessCache::open(Some(&cli.database)).await)
    };
    let enricher = Enricher::from_env();
    let orchestrator = FetchOrchestrator::new(Arc::clone(&config), Arc::clone(&cache), enricher);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(cli.port);

    web::serve(
        AppState {
            orchestrator,
            cache,
        },
        port,
    )
    .await
}
