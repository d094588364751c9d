//! Shared playback state
//!
//! Thread-safe state shared between the monitor, engine, and HTTP API,
//! with a broadcast channel fanning events out to SSE clients. RwLock
//! because reads (poll ticks, API queries) far outnumber writes.

use segue_common::events::{DjEvent, PlaybackState};
use segue_common::types::Track;
use tokio::sync::{broadcast, RwLock};

/// Shared state accessible by all components
pub struct SharedState {
    /// Current playback state as last reported by the remote player
    playback_state: RwLock<PlaybackState>,

    /// The audibly current track (updated at fade-in start during
    /// transitions, not at the remote switch)
    current_track: RwLock<Option<Track>>,

    /// Last observed playback position (position_ms, duration_ms)
    progress: RwLock<(u64, u64)>,

    /// User-set volume (0.0-1.0)
    volume: RwLock<f64>,

    /// Event broadcaster for SSE
    event_tx: broadcast::Sender<DjEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            playback_state: RwLock::new(PlaybackState::Paused),
            current_track: RwLock::new(None),
            progress: RwLock::new((0, 0)),
            volume: RwLock::new(0.8),
            event_tx,
        }
    }

    /// Broadcast an event to all SSE listeners. No receivers is fine.
    pub fn broadcast_event(&self, event: DjEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DjEvent> {
        self.event_tx.subscribe()
    }

    pub async fn playback_state(&self) -> PlaybackState {
        *self.playback_state.read().await
    }

    pub async fn set_playback_state(&self, state: PlaybackState) {
        let changed = {
            let mut guard = self.playback_state.write().await;
            let changed = *guard != state;
            *guard = state;
            changed
        };
        if changed {
            self.broadcast_event(DjEvent::PlaybackStateChanged {
                state,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    pub async fn current_track(&self) -> Option<Track> {
        self.current_track.read().await.clone()
    }

    pub async fn set_current_track(&self, track: Track) {
        *self.current_track.write().await = Some(track.clone());
        self.broadcast_event(DjEvent::TrackChanged {
            track,
            timestamp: chrono::Utc::now(),
        });
    }

    pub async fn progress(&self) -> (u64, u64) {
        *self.progress.read().await
    }

    pub async fn set_progress(&self, position_ms: u64, duration_ms: u64) {
        *self.progress.write().await = (position_ms, duration_ms);
    }

    pub async fn volume(&self) -> f64 {
        *self.volume.read().await
    }

    pub async fn set_volume(&self, volume: f64) {
        let clamped = volume.clamp(0.0, 1.0);
        *self.volume.write().await = clamped;
        self.broadcast_event(DjEvent::VolumeChanged {
            volume: clamped,
            timestamp: chrono::Utc::now(),
        });
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
