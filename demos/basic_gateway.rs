//! Start a chat-gateway server programmatically.
//!
//! Usage:
//!   export CLEWDR_API_KEY=sk-upstream
//!   export GATEWAY_API_KEY=gw-local
//!   cargo run --example basic_gateway

use chat_gateway::{build_router, AppState, GatewayConfig, SharedExchangeLog};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::find_and_load(None)?;
    let journal = SharedExchangeLog::open("gateway-example.log")?;
    let state = AppState::from_config(&config, Some(journal))?;

    println!("Upstream: {}", state.upstream.base_url);
    println!("Gateway keys: {}", state.keys.len());

    let port = config.port;
    let app = build_router(Arc::new(state));
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("Listening on http://{}", addr);
    println!();
    println!("  OPENAI_BASE_URL=http://localhost:{}/v1", port);

    axum::serve(listener, app).await?;
    Ok(())
}
