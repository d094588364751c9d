//! Playback position monitor
//!
//! A 1 Hz poll loop over the remote player. It keeps the shared state's
//! position and play/pause flags current and drives the transition
//! engine's look-ahead: prepare when the end of the current track comes
//! within the prepare horizon, execute when it enters the blend window.
//!
//! Both actions latch per track so a slow poll or a long fade can never
//! double-fire; the latches reset whenever the reported track changes.

use crate::analysis::TrackAnalyzer;
use crate::engine::TransitionEngine;
use crate::player::RemotePlayer;
use crate::queue::QueueManager;
use crate::state::SharedState;
use segue_common::events::{DjEvent, PlaybackState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Poll period
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Seconds of remaining playback at which preparation starts
const PREPARE_HORIZON_SECS: f64 = 45.0;

/// Floor for the execute window when the outro length is known
const EXECUTE_WINDOW_MIN_SECS: f64 = 8.0;

/// Execute window when no analysis is available for the current track
const EXECUTE_WINDOW_DEFAULT_SECS: f64 = 10.0;

pub struct PlaybackMonitor {
    player: Arc<dyn RemotePlayer>,
    analyzer: Arc<TrackAnalyzer>,
    engine: TransitionEngine,
    queue: Arc<QueueManager>,
    state: Arc<SharedState>,

    /// Track id the latches below apply to
    watched_track: Option<String>,
    prepare_fired: bool,
    execute_fired: bool,
}

impl PlaybackMonitor {
    pub fn new(
        player: Arc<dyn RemotePlayer>,
        analyzer: Arc<TrackAnalyzer>,
        engine: TransitionEngine,
        queue: Arc<QueueManager>,
        state: Arc<SharedState>,
    ) -> Self {
        Self {
            player,
            analyzer,
            engine,
            queue,
            state,
            watched_track: None,
            prepare_fired: false,
            execute_fired: false,
        }
    }

    /// Run the poll loop forever. Spawned as a background task at startup.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!("playback monitor started");
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One poll cycle. Separated from [`run`] so tests can step it.
    pub async fn tick(&mut self) {
        let remote = match self.player.fetch_state().await {
            Ok(state) => state,
            Err(e) => {
                debug!("state poll failed: {}", e);
                return;
            }
        };

        let playback = if remote.paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        };
        self.state.set_playback_state(playback).await;

        let Some(track_id) = remote.track_id else {
            self.watched_track = None;
            return;
        };

        if self.watched_track.as_deref() != Some(track_id.as_str()) {
            debug!("now watching track {}", track_id);
            self.watched_track = Some(track_id.clone());
            self.prepare_fired = false;
            self.execute_fired = false;
        }

        self.state
            .set_progress(remote.position_ms, remote.duration_ms)
            .await;
        self.state.broadcast_event(DjEvent::PlaybackProgress {
            track_id: track_id.clone(),
            position_ms: remote.position_ms,
            duration_ms: remote.duration_ms,
            timestamp: chrono::Utc::now(),
        });

        if remote.paused || remote.duration_ms == 0 {
            return;
        }
        let remaining =
            (remote.duration_ms.saturating_sub(remote.position_ms)) as f64 / 1000.0;

        let Some(current) = self.state.current_track().await else {
            return;
        };
        let Some(next) = self.queue.next_up().await else {
            return;
        };

        if !self.prepare_fired && remaining <= PREPARE_HORIZON_SECS {
            self.prepare_fired = true;
            info!(
                "{}s remaining on {}, preparing transition to {}",
                remaining.round(),
                current.id,
                next.id
            );
            self.engine.prepare_transition(current.clone(), next).await;
            return;
        }

        if self.prepare_fired && !self.execute_fired {
            let window = self.execute_window(&current.id).await;
            if remaining <= window {
                self.execute_fired = true;
                info!(
                    "{}s remaining on {}, executing transition",
                    remaining.round(),
                    current.id
                );
                if let Err(e) = self.engine.execute_transition().await {
                    warn!("transition failed: {}", e);
                }
            }
        }
    }

    /// Seconds before track end at which the blend should begin.
    ///
    /// Half the outro keeps the blend inside the outro with room to
    /// spare, floored so short outros still get a usable window. Without
    /// a cached analysis a fixed window is used rather than forcing an
    /// analysis round-trip from the poll loop.
    async fn execute_window(&self, track_id: &str) -> f64 {
        match self.analyzer.cached(track_id).await {
            Some(analysis) => {
                (analysis.structure.outro_secs / 2.0).max(EXECUTE_WINDOW_MIN_SECS)
            }
            None => EXECUTE_WINDOW_DEFAULT_SECS,
        }
    }
}
