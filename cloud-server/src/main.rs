//! Smart Parking Collector
//!
//! Receives the messages edge nodes decide to transmit and keeps what the
//! dashboard needs: a live slot grid, per-slot timelines, a raw message
//! log and the latest transmission-reduction metrics.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  POST /api/v1/messages   ┌───────────────────────────┐
//! │  Edge node   │ ───────────────────────▶ │  Collector (Axum)         │
//! │  (core)      │   {topic, payload}       │   payload parser          │
//! └──────────────┘                          │   CollectorStore (RwLock) │
//!                                           └─────────────┬─────────────┘
//!                                                         ▼
//!                                           GET /api/v1/slots, /metrics, /log
//! ```

mod config;
mod error;
mod handlers;
mod models;
mod store;

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "smartpark_cloud=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Smart Parking Collector starting...");
    tracing::info!(
        "History capacity: {} per timeline, up to {} slots",
        config.history_capacity,
        config.max_slots
    );

    let state = AppState {
        store: store::CollectorStore::shared(config.history_capacity, config.max_slots),
        config: config.clone(),
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Collector stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: store::SharedStore,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let ingest_routes = Router::new()
        .route("/api/v1/messages", post(handlers::messages::ingest));

    let query_routes = Router::new()
        .route("/api/v1/slots", get(handlers::slots::list))
        .route("/api/v1/slots/:id", get(handlers::slots::get))
        .route("/api/v1/events/recent", get(handlers::slots::recent_events))
        .route("/api/v1/metrics", get(handlers::metrics::get))
        .route("/api/v1/log", get(handlers::metrics::log));

    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(ingest_routes)
        .merge(query_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
