use chat_gateway::config::config_search_paths;
use chat_gateway::{build_router, AppState, GatewayConfig, SharedExchangeLog};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "chat-gateway",
    about = "OpenAI-compatible chat completions in front of a Messages API upstream",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Upstream base URL (overrides config)
    #[arg(long)]
    upstream: Option<String>,

    /// Exchange journal path (JSONL)
    #[arg(long, default_value = "chat-gateway.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = GatewayConfig::find_and_load(cli.config.as_deref())?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(upstream) = cli.upstream {
        config.upstream.base_url = upstream;
    }
    config.validate()?;

    let journal = SharedExchangeLog::open(&cli.log_file)?;
    journal.compact()?;
    let state = AppState::from_config(&config, Some(journal.clone()))?;

    info!("chat-gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("  Upstream:  {}", state.upstream.base_url);
    info!("  Routes:    v1 -> normal, code/v1 -> code");
    info!("  Port:      {}", config.port);
    info!("  API keys:  {}", state.keys.len());
    info!("  Journal:   {}", cli.log_file.display());
    if let Some(last) = journal.recent(1).first() {
        info!("  Last exchange: {} ({}, {})", last.timestamp, last.model, last.status);
    }

    if state.upstream.api_key.is_none() {
        warn!(
            "{} is not set; chat and model routes will fail until it is",
            state.upstream.api_key_env
        );
    }
    if state.keys.is_empty() {
        warn!("No gateway API keys configured; every API call will be refused");
    }

    let app = build_router(Arc::new(state));
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    journal.flush()?;
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
