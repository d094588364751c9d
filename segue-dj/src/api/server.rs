//! HTTP server setup and routing
//!
//! Builds the axum router over a cloneable application context and serves
//! it with graceful ctrl-c shutdown.

use crate::analysis::TrackAnalyzer;
use crate::engine::TransitionEngine;
use crate::player::connect::ConnectPlayer;
use crate::queue::QueueManager;
use crate::state::SharedState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use crate::error::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application context passed to all handlers.
///
/// Clone is what gives handlers `FromRef<AppContext>` through axum's
/// blanket implementation.
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub engine: TransitionEngine,
    pub queue: Arc<QueueManager>,
    pub analyzer: Arc<TrackAnalyzer>,
    /// Concrete player handle, kept for token rotation
    pub player: Arc<ConnectPlayer>,
}

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))
        // Playback control
        .route("/playback/play", post(super::handlers::play))
        .route("/playback/pause", post(super::handlers::pause))
        .route("/playback/resume", post(super::handlers::resume))
        .route("/playback/next", post(super::handlers::skip_next))
        .route("/playback/volume", get(super::handlers::get_volume))
        .route("/playback/volume", post(super::handlers::set_volume))
        .route("/playback/position", get(super::handlers::get_position))
        // Queue management
        .route("/queue", get(super::handlers::get_queue))
        .route("/queue/enqueue", post(super::handlers::enqueue))
        .route("/queue/:track_id", delete(super::handlers::remove_from_queue))
        .route("/queue/clear", post(super::handlers::clear_queue))
        .route("/queue/shuffle", post(super::handlers::shuffle_queue))
        .route("/queue/reorder", post(super::handlers::reorder_queue))
        // Analysis cache
        .route("/analysis/clear", post(super::handlers::clear_analysis_cache))
        // Remote service credentials
        .route("/auth/token", post(super::handlers::set_token))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Run the HTTP API server until ctrl-c.
pub async fn run(port: u16, ctx: AppContext) -> Result<()> {
    let app = router(ctx);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    info!("HTTP API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
