//! Integration tests for the transition engine
//!
//! Runs the full prepare/execute sequence against in-memory fakes for
//! the remote player and the AI service, under tokio's paused clock so
//! the fade timelines are deterministic.

use async_trait::async_trait;
use segue_common::types::{Track, TrackAnalysis};
use segue_dj::ai::{AiError, AnalysisRequest, RawAnalysis, RawPlan, TrackAi};
use segue_dj::analysis::TrackAnalyzer;
use segue_dj::bridge::BridgeGenerator;
use segue_dj::engine::TransitionEngine;
use segue_dj::planner::TransitionPlanner;
use segue_dj::player::{PlayerError, PlayerState, RemotePlayer};
use segue_dj::queue::QueueManager;
use segue_dj::state::SharedState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Records every call the engine makes to the remote service.
#[derive(Default)]
struct FakePlayer {
    played: Mutex<Vec<String>>,
    volumes: Mutex<Vec<f64>>,
    fail_play: AtomicBool,
}

#[async_trait]
impl RemotePlayer for FakePlayer {
    async fn play(&self, track: &Track) -> Result<(), PlayerError> {
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(PlayerError::Network("connection refused".to_string()));
        }
        self.played.lock().unwrap().push(track.id.clone());
        Ok(())
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        Ok(())
    }

    async fn resume(&self) -> Result<(), PlayerError> {
        Ok(())
    }

    async fn set_volume(&self, volume: f64) -> Result<(), PlayerError> {
        self.volumes.lock().unwrap().push(volume);
        Ok(())
    }

    async fn fetch_state(&self) -> Result<PlayerState, PlayerError> {
        Ok(PlayerState::default())
    }
}

/// AI fake returning fixed, well-formed responses.
struct FakeAi;

#[async_trait]
impl TrackAi for FakeAi {
    async fn analyze_track(&self, _request: &AnalysisRequest) -> Result<RawAnalysis, AiError> {
        Ok(RawAnalysis {
            bpm: Some(126.0),
            energy: Some(0.6),
            ..Default::default()
        })
    }

    async fn plan_transition(
        &self,
        _from: &TrackAnalysis,
        _to: &TrackAnalysis,
    ) -> Result<RawPlan, AiError> {
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
        duration_secs: 210.0,
        vibe: None,
        bpm: None,
    }
}

struct Harness {
    player: Arc<FakePlayer>,
    queue: Arc<QueueManager>,
    state: Arc<SharedState>,
    engine: TransitionEngine,
}

fn harness() -> Harness {
    let player = Arc::new(FakePlayer::default());
    let queue = Arc::new(QueueManager::new());
    let state = Arc::new(SharedState::new());
    let ai: Arc<dyn TrackAi> = Arc::new(FakeAi);
    let engine = TransitionEngine::new(
        player.clone(),
        Arc::new(TrackAnalyzer::new(ai.clone())),
        TransitionPlanner::new(ai),
        Arc::new(BridgeGenerator::silent()),
        queue.clone(),
        state.clone(),
    );
    Harness {
        player,
        queue,
        state,
        engine,
    }
}

/// Seed the harness with tracks a and b, a playing.
async fn seed_pair(h: &Harness) {
    h.queue.enqueue(track("a")).await;
    h.queue.enqueue(track("b")).await;
    h.queue.select("a").await;
    h.state.set_current_track(track("a")).await;
}

#[tokio::test(start_paused = true)]
async fn planned_transition_fades_out_switches_and_fades_in() {
    let h = harness();
    seed_pair(&h).await;

    h.engine.prepare_transition(track("a"), track("b")).await;
    assert!(h.engine.has_prepared_plan().await);

    h.engine.execute_transition().await.unwrap();

    assert_eq!(*h.player.played.lock().unwrap(), vec!["b".to_string()]);
    assert_eq!(h.state.current_track().await.unwrap().id, "b");
    assert_eq!(h.queue.current().await.unwrap().id, "b");
    assert!(!h.engine.has_prepared_plan().await);

    let volumes = h.player.volumes.lock().unwrap();
    // Fade out reaches silence before the switch, fade in ends at the
    // user volume (default 0.8)
    assert_eq!(*volumes.first().unwrap(), 0.8);
    assert!(volumes.iter().any(|v| *v == 0.0));
    assert!((volumes.last().unwrap() - 0.8).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn fade_out_is_monotone_and_fade_in_recovers() {
    let h = harness();
    seed_pair(&h).await;
    h.engine.prepare_transition(track("a"), track("b")).await;
    h.engine.execute_transition().await.unwrap();

    let volumes = h.player.volumes.lock().unwrap();
    let zero_at = volumes.iter().position(|v| *v == 0.0).unwrap();
    for pair in volumes[..=zero_at].windows(2) {
        assert!(pair[1] <= pair[0] + 1e-9, "fade out must not increase");
    }
    for pair in volumes[zero_at + 1..].windows(2) {
        assert!(pair[1] >= pair[0] - 1e-9, "fade in must not decrease");
    }
}

#[tokio::test(start_paused = true)]
async fn stale_plan_is_discarded_when_queue_changes() {
    let h = harness();
    seed_pair(&h).await;
    h.engine.prepare_transition(track("a"), track("b")).await;

    // Queue changes after preparation: b removed, c is now next
    h.queue.remove("b").await;
    h.queue.enqueue(track("c")).await;
    h.queue.select("a").await;

    h.engine.execute_transition().await.unwrap();

    assert_eq!(*h.player.played.lock().unwrap(), vec!["c".to_string()]);
    assert_eq!(h.state.current_track().await.unwrap().id, "c");
    assert!(!h.engine.has_prepared_plan().await);
}

#[tokio::test(start_paused = true)]
async fn execute_without_preparation_still_switches() {
    let h = harness();
    seed_pair(&h).await;

    h.engine.execute_transition().await.unwrap();

    assert_eq!(*h.player.played.lock().unwrap(), vec!["b".to_string()]);
    assert_eq!(h.state.current_track().await.unwrap().id, "b");
}

#[tokio::test(start_paused = true)]
async fn execute_with_empty_queue_is_a_no_op() {
    let h = harness();
    h.engine.execute_transition().await.unwrap();
    assert!(h.player.played.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_execute_is_single_flight() {
    let h = harness();
    seed_pair(&h).await;
    h.engine.prepare_transition(track("a"), track("b")).await;

    let engine = h.engine.clone();
    let first = tokio::spawn(async move { engine.execute_transition().await });
    tokio::task::yield_now().await;
    assert!(h.engine.is_transitioning());

    // Second trigger while the first is mid-fade must do nothing
    h.engine.execute_transition().await.unwrap();
    first.await.unwrap().unwrap();

    assert_eq!(h.player.played.lock().unwrap().len(), 1);
    assert!(!h.engine.is_transitioning());
}

#[tokio::test(start_paused = true)]
async fn play_invalidates_prepared_plan() {
    let h = harness();
    seed_pair(&h).await;
    h.engine.prepare_transition(track("a"), track("b")).await;
    assert!(h.engine.has_prepared_plan().await);

    h.engine.play(track("b")).await.unwrap();

    assert!(!h.engine.has_prepared_plan().await);
    assert_eq!(h.state.current_track().await.unwrap().id, "b");
}

#[tokio::test(start_paused = true)]
async fn failed_switch_restores_volume_and_keeps_current_track() {
    let h = harness();
    seed_pair(&h).await;
    h.engine.prepare_transition(track("a"), track("b")).await;
    h.player.fail_play.store(true, Ordering::SeqCst);

    let result = h.engine.execute_transition().await;

    assert!(result.is_err());
    assert_eq!(h.state.current_track().await.unwrap().id, "a");
    assert_eq!(*h.player.volumes.lock().unwrap().last().unwrap(), 0.8);
    // The flag is released so a later trigger can run
    assert!(!h.engine.is_transitioning());
    // The plan was consumed even though execution failed
    assert!(!h.engine.has_prepared_plan().await);
}

/// AI fake that parks every analysis on a semaphore, so a preparation
/// can be held in flight while the test interleaves other calls.
struct GatedAi {
    gate: tokio::sync::Semaphore,
    analyzed: Mutex<Vec<String>>,
}

impl GatedAi {
    fn new() -> Self {
        Self {
            gate: tokio::sync::Semaphore::new(0),
            analyzed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TrackAi for GatedAi {
    async fn analyze_track(&self, request: &AnalysisRequest) -> Result<RawAnalysis, AiError> {
        self.analyzed.lock().unwrap().push(request.title.clone());
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        Ok(RawAnalysis {
            bpm: Some(126.0),
            energy: Some(0.6),
            ..Default::default()
        })
    }

    async fn plan_transition(
        &self,
        _from: &TrackAnalysis,
        _to: &TrackAnalysis,
    ) -> Result<RawPlan, AiError> {
        Ok(RawPlan {
            duration: Some(10.0),
            technique: Some("crossfade".to_string()),
            ..Default::default()
        })
    }
}

#[tokio::test(start_paused = true)]
async fn playing_outside_the_queue_moves_the_cursor() {
    let h = harness();
    seed_pair(&h).await;

    // "x" was never enqueued; after the call the queue must follow what
    // is audible instead of leaving the cursor on "a"
    h.engine.play(track("x")).await.unwrap();

    assert_eq!(h.state.current_track().await.unwrap().id, "x");
    assert_eq!(h.queue.current().await.unwrap().id, "x");
    assert!(h.queue.next_up().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn prepare_for_a_new_pair_supersedes_the_in_flight_run() {
    let ai = Arc::new(GatedAi::new());
    let player = Arc::new(FakePlayer::default());
    let queue = Arc::new(QueueManager::new());
    let state = Arc::new(SharedState::new());
    let engine = TransitionEngine::new(
        player.clone(),
        Arc::new(TrackAnalyzer::new(ai.clone())),
        TransitionPlanner::new(ai.clone()),
        Arc::new(BridgeGenerator::silent()),
        queue.clone(),
        state.clone(),
    );

    // The queue says c follows a; an earlier trigger still asked for b
    queue.enqueue(track("a")).await;
    queue.enqueue(track("c")).await;
    queue.select("a").await;
    state.set_current_track(track("a")).await;

    let stale = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.prepare_transition(track("a"), track("b")).await })
    };
    tokio::task::yield_now().await;

    let fresh = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.prepare_transition(track("a"), track("c")).await })
    };
    tokio::task::yield_now().await;

    ai.gate.add_permits(8);
    stale.await.unwrap();
    fresh.await.unwrap();

    // The second request must have run its own analysis, not merely
    // awaited the b run
    let analyzed = ai.analyzed.lock().unwrap().clone();
    assert!(
        analyzed.iter().any(|t| t == "Track c"),
        "pair a -> c was never analyzed: {:?}",
        analyzed
    );

    engine.execute_transition().await.unwrap();
    assert_eq!(*player.played.lock().unwrap(), vec!["c".to_string()]);
    assert_eq!(state.current_track().await.unwrap().id, "c");
}

#[tokio::test(start_paused = true)]
async fn set_volume_is_clamped_and_recorded() {
    let h = harness();
    h.engine.set_volume(1.7).await.unwrap();
    assert_eq!(h.state.volume().await, 1.0);
    assert_eq!(*h.player.volumes.lock().unwrap().last().unwrap(), 1.0);
}
