//! Webhook HTTP server (single port).

use crate::config::{self, Config, HEALTH_PATH};
use crate::handler::{EventHandler, HandlerResponse};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared state for the webhook routes. The handler is immutable, so requests never contend.
#[derive(Clone)]
pub struct WebhookState {
    pub handler: Arc<EventHandler>,
    /// Port reported by the health probe.
    pub port: u16,
}

impl WebhookState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            handler: Arc::new(EventHandler::from_config(config)),
            port: config.server.port,
        }
    }
}

/// Routes: `POST <path>` for chat events, `GET /health` for probes.
/// The event route has no body limit: every body reaches the handler, which answers 400 or 200 only.
pub fn router(state: WebhookState, path: &str) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health_http))
        .route(path, post(chat_event).layer(DefaultBodyLimit::disable()))
        .with_state(state)
}

/// Run the webhook server; binds to config.server.bind:config.server.port.
/// The port is taken as-is: callers apply PORT / CLI overrides before calling.
/// Blocks until shutdown (e.g. Ctrl+C or SIGTERM).
pub async fn run_server(config: Config) -> Result<()> {
    config::validate(&config)?;
    let state = WebhookState::from_config(&config);
    let app = router(state, &config.server.path);

    let bind_addr = format!("{}:{}", config.server.bind.trim(), config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!(
        "webhook listening on {} (events: POST {})",
        bind_addr,
        config.server.path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server exited")?;
    log::info!("webhook stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// POST <path> — one chat event in, synchronous reply out.
async fn chat_event(State(state): State<WebhookState>, body: Bytes) -> HandlerResponse {
    let request_id = uuid::Uuid::new_v4();
    log::debug!("request {}: {} byte body", request_id, body.len());
    let res = state.handler.handle(&body);
    log::debug!("request {}: {} ({} byte reply)", request_id, res.status, res.body.len());
    res
}

/// GET /health returns a simple health JSON (for probes).
async fn health_http(State(state): State<WebhookState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.port,
    }))
}
