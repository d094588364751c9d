//! HTTP request handlers
//!
//! REST endpoints for playback control, queue management, and remote
//! service credentials.

use crate::api::server::AppContext;
use crate::player::PlayerError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use segue_common::events::DjEvent;
use segue_common::types::Track;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    /// Queue entry to play; omitted means current selection or queue head
    #[serde(default)]
    pub track_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    /// 0.0-1.0 user scale
    pub volume: f64,
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    volume: f64,
}

#[derive(Debug, Serialize)]
pub struct PositionResponse {
    track_id: Option<String>,
    position_ms: u64,
    duration_ms: u64,
    state: String,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    current_track_id: Option<String>,
    tracks: Vec<Track>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub access_token: String,
}

type HandlerError = (StatusCode, Json<StatusResponse>);

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> HandlerError {
    (
        status,
        Json(StatusResponse {
            status: format!("error: {}", message),
        }),
    )
}

fn player_error(e: PlayerError) -> HandlerError {
    let status = match &e {
        PlayerError::AuthExpired => StatusCode::UNAUTHORIZED,
        PlayerError::Forbidden => StatusCode::FORBIDDEN,
        PlayerError::DeviceNotReady => StatusCode::SERVICE_UNAVAILABLE,
        PlayerError::Api(..) | PlayerError::Network(_) => StatusCode::BAD_GATEWAY,
    };
    error!("player request failed: {}", e);
    error_response(status, e)
}

// ============================================================================
// Health
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "segue-dj".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Playback
// ============================================================================

/// POST /playback/play - play a queued track (or the queue head)
pub async fn play(
    State(ctx): State<AppContext>,
    Json(req): Json<PlayRequest>,
) -> Result<StatusCode, HandlerError> {
    let track = match req.track_id {
        Some(id) => ctx
            .queue
            .tracks()
            .await
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "track not in queue"))?,
        None => match ctx.queue.current().await {
            Some(t) => t,
            None => ctx
                .queue
                .next_up()
                .await
                .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "queue is empty"))?,
        },
    };

    info!("play request: \"{}\" by {}", track.title, track.artist);
    ctx.engine.play(track).await.map_err(player_error)?;
    Ok(StatusCode::OK)
}

/// POST /playback/pause
pub async fn pause(State(ctx): State<AppContext>) -> Result<StatusCode, HandlerError> {
    ctx.engine.pause().await.map_err(player_error)?;
    Ok(StatusCode::OK)
}

/// POST /playback/resume
pub async fn resume(State(ctx): State<AppContext>) -> Result<StatusCode, HandlerError> {
    ctx.engine.resume().await.map_err(player_error)?;
    Ok(StatusCode::OK)
}

/// POST /playback/next - transition to the next queued track now.
///
/// Uses the full transition pipeline, so a prepared plan (if one exists
/// for the pair) still applies.
pub async fn skip_next(State(ctx): State<AppContext>) -> Result<StatusCode, HandlerError> {
    if ctx.queue.next_up().await.is_none() {
        return Err(error_response(StatusCode::BAD_REQUEST, "nothing queued"));
    }
    ctx.engine.execute_transition().await.map_err(player_error)?;
    Ok(StatusCode::OK)
}

/// GET /playback/volume
pub async fn get_volume(State(ctx): State<AppContext>) -> Json<VolumeResponse> {
    Json(VolumeResponse {
        volume: ctx.state.volume().await,
    })
}

/// POST /playback/volume
pub async fn set_volume(
    State(ctx): State<AppContext>,
    Json(req): Json<VolumeRequest>,
) -> Result<Json<VolumeResponse>, HandlerError> {
    if !req.volume.is_finite() {
        return Err(error_response(StatusCode::BAD_REQUEST, "volume must be finite"));
    }
    let volume = req.volume.clamp(0.0, 1.0);
    ctx.engine.set_volume(volume).await.map_err(player_error)?;
    Ok(Json(VolumeResponse { volume }))
}

/// GET /playback/position
pub async fn get_position(State(ctx): State<AppContext>) -> Json<PositionResponse> {
    let (position_ms, duration_ms) = ctx.state.progress().await;
    let state = ctx.state.playback_state().await;
    Json(PositionResponse {
        track_id: ctx.state.current_track().await.map(|t| t.id),
        position_ms,
        duration_ms,
        state: format!("{:?}", state).to_lowercase(),
    })
}

// ============================================================================
// Queue
// ============================================================================

/// GET /queue
pub async fn get_queue(State(ctx): State<AppContext>) -> Json<QueueResponse> {
    Json(QueueResponse {
        current_track_id: ctx.queue.current().await.map(|t| t.id),
        tracks: ctx.queue.tracks().await,
    })
}

/// POST /queue/enqueue
pub async fn enqueue(
    State(ctx): State<AppContext>,
    Json(track): Json<Track>,
) -> Result<StatusCode, HandlerError> {
    if track.id.is_empty() || track.audio_url.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "track id and audio_url are required",
        ));
    }
    info!("enqueue: \"{}\" by {}", track.title, track.artist);
    ctx.queue.enqueue(track).await;
    ctx.state.broadcast_event(DjEvent::QueueChanged {
        timestamp: chrono::Utc::now(),
    });
    Ok(StatusCode::CREATED)
}

/// DELETE /queue/:track_id
pub async fn remove_from_queue(
    State(ctx): State<AppContext>,
    Path(track_id): Path<String>,
) -> Result<StatusCode, HandlerError> {
    if !ctx.queue.remove(&track_id).await {
        return Err(error_response(StatusCode::NOT_FOUND, "track not in queue"));
    }
    ctx.state.broadcast_event(DjEvent::QueueChanged {
        timestamp: chrono::Utc::now(),
    });
    Ok(StatusCode::NO_CONTENT)
}

/// POST /queue/clear
pub async fn clear_queue(State(ctx): State<AppContext>) -> StatusCode {
    ctx.queue.clear().await;
    ctx.state.broadcast_event(DjEvent::QueueChanged {
        timestamp: chrono::Utc::now(),
    });
    StatusCode::NO_CONTENT
}

/// POST /queue/shuffle - shuffle everything after the current track
pub async fn shuffle_queue(State(ctx): State<AppContext>) -> StatusCode {
    ctx.queue.shuffle().await;
    ctx.state.broadcast_event(DjEvent::QueueChanged {
        timestamp: chrono::Utc::now(),
    });
    StatusCode::OK
}

/// POST /queue/reorder
pub async fn reorder_queue(
    State(ctx): State<AppContext>,
    Json(req): Json<ReorderRequest>,
) -> Result<StatusCode, HandlerError> {
    if !ctx.queue.reorder(req.from, req.to).await {
        return Err(error_response(StatusCode::BAD_REQUEST, "index out of range"));
    }
    ctx.state.broadcast_event(DjEvent::QueueChanged {
        timestamp: chrono::Utc::now(),
    });
    Ok(StatusCode::OK)
}

// ============================================================================
// Analysis
// ============================================================================

/// POST /analysis/clear - drop all cached track analyses
pub async fn clear_analysis_cache(State(ctx): State<AppContext>) -> StatusCode {
    ctx.analyzer.clear_cache().await;
    info!("analysis cache cleared");
    StatusCode::NO_CONTENT
}

// ============================================================================
// Credentials
// ============================================================================

/// POST /auth/token - rotate the remote service access token.
///
/// Tokens are short-lived and owned by whatever front end performed the
/// OAuth flow; the daemon only ever receives them.
pub async fn set_token(
    State(ctx): State<AppContext>,
    Json(req): Json<TokenRequest>,
) -> Result<StatusCode, HandlerError> {
    if req.access_token.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "empty token"));
    }
    ctx.player.set_access_token(req.access_token).await;
    info!("remote access token updated");
    Ok(StatusCode::OK)
}
