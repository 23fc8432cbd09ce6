//! HTTP surface of the Huddle server.
//!
//! One WebSocket endpoint plus a health check. Identity is resolved from a
//! bearer token before the upgrade; a connection for an unresolved identity
//! never comes into existence.

use crate::config::Config;
use crate::connection;
use crate::metrics;
use anyhow::Result;
use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use huddle_core::{ChatRouter, Hub, MemoryDirectory, MemoryStore, MessageStore, RelationshipOracle};
use huddle_protocol::UserId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Shared server state.
pub struct AppState {
    /// The message router (owns the hub handle).
    pub router: ChatRouter,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state over the given collaborators.
    #[must_use]
    pub fn new(
        config: Config,
        oracle: Arc<dyn RelationshipOracle>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        let hub = Arc::new(Hub::new());
        Self {
            router: ChatRouter::new(hub, oracle, store),
            config,
        }
    }

    fn resolve_token(&self, token: &str) -> Option<UserId> {
        self.config.auth.tokens.get(token).copied()
    }
}

/// Build the axum application router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Run the HTTP/WebSocket server with in-memory collaborators.
///
/// Production deployments construct [`AppState`] with real oracle and store
/// implementations and serve [`app`] themselves.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(MemoryDirectory::new()),
        Arc::new(MemoryStore::new()),
    ));

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Huddle server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// WebSocket upgrade handler.
///
/// Accepts the token either as an `Authorization: Bearer` header or a
/// `?token=` query parameter (browser WebSocket clients cannot set headers).
async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let token = bearer_token(&headers).or_else(|| params.get("token").map(String::as_str));

    let Some(user) = token.and_then(|t| state.resolve_token(t)) else {
        warn!("WebSocket upgrade refused: unresolved identity");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    debug!(user, "WebSocket upgrade accepted");
    ws.on_upgrade(move |socket| connection::serve(socket, user, state))
        .into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
