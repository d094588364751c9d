//! Integration tests for the playback monitor
//!
//! Steps the poll loop by hand and checks the prepare/execute latches
//! against a scriptable remote player state.

use async_trait::async_trait;
use segue_common::events::PlaybackState;
use segue_common::types::{Track, TrackAnalysis};
use segue_dj::ai::{AiError, AnalysisRequest, RawAnalysis, RawPlan, RawStructure, TrackAi};
use segue_dj::analysis::TrackAnalyzer;
use segue_dj::bridge::BridgeGenerator;
use segue_dj::engine::TransitionEngine;
use segue_dj::monitor::PlaybackMonitor;
use segue_dj::planner::TransitionPlanner;
use segue_dj::player::{PlayerError, PlayerState, RemotePlayer};
use segue_dj::queue::QueueManager;
use segue_dj::state::SharedState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Remote player whose reported state the test scripts directly.
#[derive(Default)]
struct ScriptedPlayer {
    state: Mutex<PlayerState>,
    played: Mutex<Vec<String>>,
}

impl ScriptedPlayer {
    fn set_position(&self, track_id: &str, position_ms: u64, duration_ms: u64, paused: bool) {
        *self.state.lock().unwrap() = PlayerState {
            paused,
            position_ms,
            duration_ms,
            track_id: Some(track_id.to_string()),
        };
    }
}

#[async_trait]
impl RemotePlayer for ScriptedPlayer {
    async fn play(&self, track: &Track) -> Result<(), PlayerError> {
        self.played.lock().unwrap().push(track.id.clone());
        Ok(())
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        Ok(())
    }

    async fn resume(&self) -> Result<(), PlayerError> {
        Ok(())
    }

    async fn set_volume(&self, _volume: f64) -> Result<(), PlayerError> {
        Ok(())
    }

    async fn fetch_state(&self) -> Result<PlayerState, PlayerError> {
        Ok(self.state.lock().unwrap().clone())
    }
}

/// Counts planning calls so the tests can prove prepare fired exactly once.
#[derive(Default)]
struct CountingAi {
    plans: AtomicUsize,
}

#[async_trait]
impl TrackAi for CountingAi {
    async fn analyze_track(&self, _request: &AnalysisRequest) -> Result<RawAnalysis, AiError> {
        Ok(RawAnalysis {
            bpm: Some(124.0),
            energy: Some(0.5),
            structure: Some(RawStructure {
                intro: Some(4.0),
                outro: Some(30.0),
                drop: Some(40.0),
            }),
            ..Default::default()
        })
    }

    async fn plan_transition(
        &self,
        _from: &TrackAnalysis,
        _to: &TrackAnalysis,
    ) -> Result<RawPlan, AiError> {
        self.plans.fetch_add(1, Ordering::SeqCst);
        Ok(RawPlan {
            duration: Some(10.0),
            technique: Some("crossfade".to_string()),
            ..Default::default()
        })
    }
}

fn track(id: &str) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Track {}", id),
        artist: "Artist".to_string(),
        cover_url: None,
        audio_url: format!("remote:track:{}", id),
        duration_secs: 200.0,
        vibe: None,
        bpm: None,
    }
}

struct Harness {
    player: Arc<ScriptedPlayer>,
    ai: Arc<CountingAi>,
    queue: Arc<QueueManager>,
    state: Arc<SharedState>,
    engine: TransitionEngine,
    monitor: PlaybackMonitor,
}

fn harness() -> Harness {
    let player = Arc::new(ScriptedPlayer::default());
    let ai = Arc::new(CountingAi::default());
    let queue = Arc::new(QueueManager::new());
    let state = Arc::new(SharedState::new());
    let analyzer = Arc::new(TrackAnalyzer::new(ai.clone() as Arc<dyn TrackAi>));
    let engine = TransitionEngine::new(
        player.clone(),
        analyzer.clone(),
        TransitionPlanner::new(ai.clone()),
        Arc::new(BridgeGenerator::silent()),
        queue.clone(),
        state.clone(),
    );
    let monitor = PlaybackMonitor::new(
        player.clone(),
        analyzer,
        engine.clone(),
        queue.clone(),
        state.clone(),
    );
    Harness {
        player,
        ai,
        queue,
        state,
        engine,
        monitor,
    }
}

async fn seed_pair(h: &Harness) {
    h.queue.enqueue(track("a")).await;
    h.queue.enqueue(track("b")).await;
    h.queue.select("a").await;
    h.state.set_current_track(track("a")).await;
}

#[tokio::test(start_paused = true)]
async fn prepare_fires_once_inside_the_horizon() {
    let mut h = harness();
    seed_pair(&h).await;

    // 60s remaining: outside the horizon
    h.player.set_position("a", 140_000, 200_000, false);
    h.monitor.tick().await;
    assert!(!h.engine.has_prepared_plan().await);

    // 44s remaining: prepare
    h.player.set_position("a", 156_000, 200_000, false);
    h.monitor.tick().await;
    assert!(h.engine.has_prepared_plan().await);
    assert_eq!(h.ai.plans.load(Ordering::SeqCst), 1);

    // Later ticks on the same track do not re-plan
    h.player.set_position("a", 158_000, 200_000, false);
    h.monitor.tick().await;
    assert_eq!(h.ai.plans.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn execute_fires_once_inside_the_outro_window() {
    let mut h = harness();
    seed_pair(&h).await;

    h.player.set_position("a", 156_000, 200_000, false);
    h.monitor.tick().await;
    assert!(h.engine.has_prepared_plan().await);

    // Outro is 30s, so the window opens at 15s remaining; 16s is outside
    h.player.set_position("a", 184_000, 200_000, false);
    h.monitor.tick().await;
    assert!(h.player.played.lock().unwrap().is_empty());

    // 14s remaining: transition runs
    h.player.set_position("a", 186_000, 200_000, false);
    h.monitor.tick().await;
    assert_eq!(*h.player.played.lock().unwrap(), vec!["b".to_string()]);

    // Still reporting the old track near its end: no double trigger
    h.player.set_position("a", 195_000, 200_000, false);
    h.monitor.tick().await;
    assert_eq!(h.player.played.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn latches_reset_when_the_track_changes() {
    let mut h = harness();
    seed_pair(&h).await;
    h.queue.enqueue(track("c")).await;

    // Run the full cycle for a -> b
    h.player.set_position("a", 156_000, 200_000, false);
    h.monitor.tick().await;
    h.player.set_position("a", 186_000, 200_000, false);
    h.monitor.tick().await;
    assert_eq!(h.player.played.lock().unwrap().len(), 1);

    // The remote now reports b near its own end; b -> c must prepare anew
    h.player.set_position("b", 160_000, 200_000, false);
    h.monitor.tick().await;
    assert_eq!(h.ai.plans.load(Ordering::SeqCst), 2);
    h.player.set_position("b", 186_000, 200_000, false);
    h.monitor.tick().await;
    assert_eq!(*h.player.played.lock().unwrap(), vec!["b".to_string(), "c".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn paused_playback_never_prepares() {
    let mut h = harness();
    seed_pair(&h).await;

    h.player.set_position("a", 170_000, 200_000, true);
    h.monitor.tick().await;

    assert!(!h.engine.has_prepared_plan().await);
    assert_eq!(h.state.playback_state().await, PlaybackState::Paused);
}

#[tokio::test(start_paused = true)]
async fn nothing_queued_means_no_preparation() {
    let mut h = harness();
    h.queue.enqueue(track("a")).await;
    h.queue.select("a").await;
    h.state.set_current_track(track("a")).await;

    h.player.set_position("a", 190_000, 200_000, false);
    h.monitor.tick().await;

    assert!(!h.engine.has_prepared_plan().await);
    assert!(h.player.played.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn tick_publishes_progress() {
    let mut h = harness();
    seed_pair(&h).await;

    h.player.set_position("a", 30_000, 200_000, false);
    h.monitor.tick().await;

    assert_eq!(h.state.progress().await, (30_000, 200_000));
    assert_eq!(h.state.playback_state().await, PlaybackState::Playing);
}
