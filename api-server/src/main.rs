//! IntruScan API Server
//!
//! Thin HTTP host for the `intruscan-core` analysis pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    INTRUSCAN SERVER                      │
//! ├──────────────────────────────────────────────────────────┤
//! │  POST /api/analyze ──┐                                   │
//! │  POST /api/classify ─┼─► multipart "file" ─► spawn_blocking
//! │                      │            │                      │
//! │                      │            ▼                      │
//! │                      │   ┌──────────────────┐            │
//! │                      │   │  intruscan-core  │            │
//! │                      │   │  Pipeline        │            │
//! │                      │   └──────────────────┘            │
//! │  GET  /api/health ───┴─► model_status()                  │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod config;
mod handlers;
mod error;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use intruscan_core::{Pipeline, PipelineError, SequencePipeline, StatisticalPipeline};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize logging (also captures the core's `log` records)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "intruscan_server=debug,intruscan_core=info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env();

    tracing::info!("IntruScan server starting ({})...", config.environment);
    tracing::info!("Classifier model: {}", config.pipeline.model_path.display());

    // Build application state
    let state = match AppState::new(config.clone()) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Invalid pipeline configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub statistical: Arc<StatisticalPipeline>,
    pub sequence: Arc<SequencePipeline>,
}

impl AppState {
    pub fn new(config: config::Config) -> Result<Self, PipelineError> {
        let statistical = Pipeline::statistical(&config.pipeline)?;
        let sequence = Pipeline::sequence(&config.pipeline)?;

        Ok(Self {
            config: Arc::new(config),
            statistical: Arc::new(statistical),
            sequence: Arc::new(sequence),
        })
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.allowed_origin.as_deref());
    let body_limit = state.config.max_upload_bytes;

    if state.config.is_production() && state.config.allowed_origin.is_none() {
        tracing::warn!("ALLOWED_ORIGIN is not set, accepting any origin");
    }

    let api_routes = Router::new()
        .route("/api/analyze", post(handlers::analyze::analyze))
        .route("/api/classify", post(handlers::analyze::classify))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/health", get(handlers::health::check))
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(e)) => {
            tracing::warn!("Ignoring invalid ALLOWED_ORIGIN: {}", e);
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}
