//! Server-Sent Events broadcaster
//!
//! Streams daemon events to connected UI clients. Each event is emitted
//! with its name in the SSE `event:` field and the serialized payload as
//! data; a keep-alive comment goes out every 15 seconds.

use crate::api::server::AppContext;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// GET /events - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("new SSE client connected");

    let rx = ctx.state.subscribe_events();

    // Snapshot first so a fresh client renders without waiting for the
    // next state change
    let (position_ms, duration_ms) = ctx.state.progress().await;
    let snapshot = serde_json::json!({
        "state": ctx.state.playback_state().await,
        "track": ctx.state.current_track().await,
        "volume": ctx.state.volume().await,
        "position_ms": position_ms,
        "duration_ms": duration_ms,
    });
    let initial = futures::stream::once(async move {
        Ok(Event::default().event("connected").data(snapshot.to_string()))
    });

    let live = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Some(Ok(Event::default().event(event.event_name()).data(json))),
                Err(e) => {
                    warn!("failed to serialize event: {}", e);
                    None
                }
            },
            Err(e) => {
                // Lagged receiver; drop the gap rather than the client
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    let stream = initial.chain(live);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
