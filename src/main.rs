//! Cue Clock - table session timers for a billiards hall dashboard
//!
//! This is the main entry point for the cue-clock application.

use std::sync::Arc;
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use cue_clock::{
    api::create_router,
    config::Config,
    state::AppState,
    tasks::table_ticker_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("cue_clock={},tower_http=info", config.log_level()))
        .init();

    info!("Starting cue-clock server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, tables={}, tick={}ms, throttle={}ms, cache={}ms",
        config.host,
        config.port,
        config.tables,
        config.tick_ms,
        config.throttle_ms,
        config.cache_window_ms
    );

    let state = Arc::new(AppState::new(&config));

    // Start the table ticker background task
    let ticker_state = Arc::clone(&state);
    tokio::spawn(async move {
        table_ticker_task(ticker_state).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(state);

    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET   /tables              - List tables with remaining time");
    info!("  GET   /tables/:id          - Show one table");
    info!("  PATCH /tables/:id          - Update guests, server or notes");
    info!("  POST  /tables/:id/start    - Start a session");
    info!("  POST  /tables/:id/pause    - Pause a session");
    info!("  POST  /tables/:id/resume   - Resume a session");
    info!("  POST  /tables/:id/add-time - Add or remove minutes");
    info!("  POST  /tables/:id/end      - End a session");
    info!("  GET   /events              - Timer notification stream");
    info!("  GET   /status              - Ticker status");
    info!("  GET   /health              - Health check");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    info!("Server shutdown complete");
    Ok(())
}
