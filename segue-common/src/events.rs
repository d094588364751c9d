//! Event types for the Segue event system
//!
//! Broadcast by the daemon's shared state and surfaced to UI clients over
//! SSE. Every event carries a UTC timestamp.

use crate::types::{Track, TransitionTechnique};
use serde::{Deserialize, Serialize};

/// Playback state as reported by the remote player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

/// Segue event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DjEvent {
    /// Playback state changed (play/pause/resume)
    PlaybackStateChanged {
        state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The audible current track changed.
    ///
    /// During a transition this fires when fade-in begins, not when the
    /// remote switch is issued, so UI reflects what is actually audible.
    TrackChanged {
        track: Track,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback position update (sent every 1s while playing)
    PlaybackProgress {
        track_id: String,
        position_ms: u64,
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Volume changed (0.0-1.0 user scale)
    VolumeChanged {
        volume: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue contents changed (notification only)
    QueueChanged {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Track analysis finished (cache miss resolved)
    AnalysisCompleted {
        track_id: String,
        bpm: f64,
        energy: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A transition plan is ready for the upcoming pair
    TransitionPrepared {
        from_track_id: String,
        to_track_id: String,
        technique: TransitionTechnique,
        duration_secs: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transition execution began
    TransitionStarted {
        from_track_id: String,
        to_track_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transition finished (the incoming track is at full volume)
    TransitionCompleted {
        to_track_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl DjEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_name(&self) -> &'static str {
        match self {
            DjEvent::PlaybackStateChanged { .. } => "playback_state_changed",
            DjEvent::TrackChanged { .. } => "track_changed",
            DjEvent::PlaybackProgress { .. } => "playback_progress",
            DjEvent::VolumeChanged { .. } => "volume_changed",
            DjEvent::QueueChanged { .. } => "queue_changed",
            DjEvent::AnalysisCompleted { .. } => "analysis_completed",
            DjEvent::TransitionPrepared { .. } => "transition_prepared",
            DjEvent::TransitionStarted { .. } => "transition_started",
            DjEvent::TransitionCompleted { .. } => "transition_completed",
        }
    }
}
