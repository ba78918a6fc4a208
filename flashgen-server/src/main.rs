//! flashgen-server - topic-to-flashcard generation service

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use flashgen_core::config::LoggingConfig;
use flashgen_core::FlashgenConfig;
use flashgen_llm::OpenAiCompatibleBackend;
use flashgen_server::{router, AppState, Pipeline};
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "flashgen-server")]
#[command(about = "Generate study flashcards from a topic via an LLM", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Listen address, overrides `server.bind` and FLASHGEN_BIND
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json: bool,
}

fn init_logging(logging: &LoggingConfig, json: bool) {
    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json || logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr).compact())
            .init();
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FlashgenConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => FlashgenConfig::default(),
    };
    config.apply_env().context("applying environment overrides")?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    init_logging(&config.logging, cli.json);

    let backend = OpenAiCompatibleBackend::from_config(&config.llm)
        .context("the LLM backend cannot start")?;
    let pipeline = Pipeline::new(Arc::new(backend), &config);
    let sweeper = pipeline.spawn_quota_sweeper(config.quota.sweep_interval());

    let app = router(AppState {
        pipeline,
        trust_proxy: config.server.trust_proxy,
    });

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    info!(
        addr = %config.server.bind,
        model = %config.llm.model,
        limit = config.quota.max_requests,
        fallback = config.fallback.enabled,
        "flashgen-server listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    sweeper.abort();
    info!("flashgen-server stopped");
    Ok(())
}
