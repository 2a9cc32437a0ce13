//! HTTP surface of the relay.
//!
//! - `GET  /health`     readiness of backend + model
//! - `POST /chat`       single generation
//! - `GET  /model/info` backend metadata for the configured model

use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::inference::InferenceClient;

pub mod handlers;
pub mod models;

/// Shared handler state. The client is immutable, so no lock is needed.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<InferenceClient>,
}

impl AppState {
    pub fn new(client: InferenceClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

/// Build the relay router.
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/chat", post(handlers::chat))
        .route("/model/info", get(handlers::model_info))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// CORS for the configured origins.
///
/// Explicit origins get credentials and mirrored request headers. A `"*"`
/// entry switches to any-origin, which cannot be combined with credentials.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any).allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(allowed))
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, client: InferenceClient) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let app = create_router(AppState::new(client), &config.cors_origins);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(addr = %addr, "llm-relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("llm-relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => {
            // Without a signal handler, run until the process is killed.
            tracing::error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}
