//! Twilog search daemon entry point.
//!
//! Grounded on the reference gateway's startup preamble (dotenv, JSON
//! tracing, config load, metrics registration) and `embed_server.py`'s
//! `main()` subcommand dispatch (`start`/`stop`/`status`/hidden daemon
//! relaunch).

mod cli;
mod daemon;
mod rpc;

use clap::Parser;
use cli::{Cli, Commands};
use rpc::dispatcher::Dispatcher;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, Level};
use twilog_common::{AppConfig, Embedder, PostRepository, SummaryRepository, VectorStore};
use twilog_common::embeddings::HttpEmbedder;
use twilog_search::SearchEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt().with_max_level(Level::INFO).with_target(true).json().init();

    info!("twilog-server v{}", twilog_common::VERSION);

    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "failed to load configuration");
        e
    })?;

    twilog_common::metrics::register_metrics();

    let cli = Cli::parse();
    match cli.command {
        Commands::Start { model } => {
            daemon::start(&model, &config).await?;
            println!("daemon ready");
        }
        Commands::Stop => {
            daemon::stop(&config).await?;
            println!("stop requested");
        }
        Commands::Status => {
            let status = daemon::status(&config).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Daemon { model } => {
            run_daemon(model, config).await?;
        }
    }

    Ok(())
}

async fn run_daemon(model: String, config: AppConfig) -> anyhow::Result<()> {
    if config.observability.metrics_port != 0 {
        let addr: std::net::SocketAddr = ([0, 0, 0, 0], config.observability.metrics_port).into();
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!(port = config.observability.metrics_port, "prometheus exporter installed");
    }

    let content_store = VectorStore::load(&config.stores.embeddings_dir)?;
    let reasoning_store = VectorStore::load_optional(&config.stores.reasoning_dir)?;
    let summary_store = VectorStore::load_optional(&config.stores.summary_dir)?;
    let posts = PostRepository::load(&config.stores.csv_path)?;
    let summaries = SummaryRepository::load(&config.stores.results_path)?;

    let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(
        config.embedder.endpoint.clone(),
        std::time::Duration::from_secs(config.embedder.timeout_secs),
        config.embedder.max_retries,
        config.embedder.dimension,
    ));

    let engine = Arc::new(SearchEngine::new(content_store, reasoning_store, summary_store, posts, summaries, embedder));

    info!(
        posts = engine.post_count(),
        common_set = engine.common_set_size(),
        "stores loaded"
    );
    twilog_common::metrics::record_common_set_size(engine.common_set_size());

    let ready = Arc::new(AtomicBool::new(false));
    let dispatcher = Arc::new(Dispatcher::new(engine, model, ready.clone()));

    daemon::run_daemon(dispatcher, ready, &config).await
}
