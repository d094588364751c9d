//! Transition engine
//!
//! Orchestrates the whole handoff: analysis and planning ahead of time
//! (prepare), then a timed equal-power fade sequence driving the remote
//! player and the bridge generator (execute).
//!
//! State machine: Idle -> Preparing -> Prepared -> Transitioning -> Idle.
//! Exactly one transition may be in flight; the `transitioning` flag is
//! set before the first suspension point and cleared by a drop guard so a
//! failure can never leave the engine stuck. A prepared plan is consumed
//! exactly once and only against the pair it was computed for; anything
//! stale is discarded in favor of a plain short-fade switch.

use crate::analysis::TrackAnalyzer;
use crate::bridge::BridgeGenerator;
use crate::planner::TransitionPlanner;
use crate::player::{PlayerError, RemotePlayer};
use crate::queue::QueueManager;
use crate::state::SharedState;
use futures::future::{BoxFuture, FutureExt, Shared};
use segue_common::events::{DjEvent, PlaybackState};
use segue_common::types::{Track, TrackAnalysis, TransitionPlan};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, Instant};
use tracing::{debug, info, warn};

/// Fade sampling period; short enough to sound continuous
const FADE_TICK: Duration = Duration::from_millis(50);

/// Duration of the short fade used when no plan is available
const FALLBACK_FADE: Duration = Duration::from_millis(1500);

/// Bridge level as a proportion of the user volume, so filler sits under
/// the primary track and survives mid-transition volume changes
const BRIDGE_LEVEL: f64 = 0.8;

/// A plan bound to the exact pair it was computed for
struct PreparedTransition {
    from_id: String,
    to: Track,
    from_analysis: TrackAnalysis,
    to_analysis: TrackAnalysis,
    plan: TransitionPlan,
}

type PrepareFuture = Shared<BoxFuture<'static, ()>>;

/// In-flight preparation keyed by the pair it is computing for
struct InFlightPrepare {
    from_id: String,
    to_id: String,
    future: PrepareFuture,
}

impl InFlightPrepare {
    fn is_for(&self, from_id: &str, to_id: &str) -> bool {
        self.from_id == from_id && self.to_id == to_id
    }
}

struct EngineInner {
    player: Arc<dyn RemotePlayer>,
    analyzer: Arc<TrackAnalyzer>,
    planner: TransitionPlanner,
    bridge: Arc<BridgeGenerator>,
    queue: Arc<QueueManager>,
    state: Arc<SharedState>,

    /// Single-flight guard: true while a transition is executing
    transitioning: AtomicBool,
    /// Look-ahead state from the last successful prepare
    prepared: Mutex<Option<PreparedTransition>>,
    /// In-flight preparation, shared so execute can await the same run
    preparing: Mutex<Option<InFlightPrepare>>,
}

/// Clears the transitioning flag on every exit path, panics included.
struct TransitionGuard(Arc<EngineInner>);

impl Drop for TransitionGuard {
    fn drop(&mut self) {
        self.0.transitioning.store(false, Ordering::SeqCst);
    }
}

/// Transition engine handle (cheap to clone)
#[derive(Clone)]
pub struct TransitionEngine {
    inner: Arc<EngineInner>,
}

impl TransitionEngine {
    pub fn new(
        player: Arc<dyn RemotePlayer>,
        analyzer: Arc<TrackAnalyzer>,
        planner: TransitionPlanner,
        bridge: Arc<BridgeGenerator>,
        queue: Arc<QueueManager>,
        state: Arc<SharedState>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                player,
                analyzer,
                planner,
                bridge,
                queue,
                state,
                transitioning: AtomicBool::new(false),
                prepared: Mutex::new(None),
                preparing: Mutex::new(None),
            }),
        }
    }

    /// Plain playback of a track (explicit user selection).
    ///
    /// Safety net for interrupted transitions: always silences bridge
    /// filler and invalidates any prepared plan, which now refers to a
    /// pair that is no longer upcoming.
    pub async fn play(&self, track: Track) -> Result<(), PlayerError> {
        self.inner.bridge.stop();
        self.inner.prepared.lock().await.take();

        // An out-of-queue selection still becomes the queue cursor, so
        // the next transition follows from what is actually audible.
        if self.inner.queue.select(&track.id).await.is_none() {
            self.inner.queue.enqueue(track.clone()).await;
            self.inner.queue.select(&track.id).await;
        }
        self.inner.player.play(&track).await?;

        let volume = self.inner.state.volume().await;
        self.inner.player.set_volume(volume).await?;
        self.inner.state.set_current_track(track).await;
        self.inner
            .state
            .set_playback_state(PlaybackState::Playing)
            .await;
        Ok(())
    }

    /// Pause playback. Bridge filler must never keep playing under a
    /// paused track, so it is stopped before delegating.
    pub async fn pause(&self) -> Result<(), PlayerError> {
        self.inner.bridge.stop();
        self.inner.player.pause().await?;
        self.inner
            .state
            .set_playback_state(PlaybackState::Paused)
            .await;
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), PlayerError> {
        self.inner.bridge.stop();
        self.inner.player.resume().await?;
        self.inner
            .state
            .set_playback_state(PlaybackState::Playing)
            .await;
        Ok(())
    }

    /// Set the user volume. The bridge follows at a fixed proportion so
    /// the balance holds even when volume changes mid-transition.
    pub async fn set_volume(&self, volume: f64) -> Result<(), PlayerError> {
        let volume = volume.clamp(0.0, 1.0);
        self.inner.state.set_volume(volume).await;
        self.inner.bridge.set_volume(volume * BRIDGE_LEVEL);
        self.inner.player.set_volume(volume).await
    }

    /// Analyze both tracks and store a plan for the upcoming pair.
    ///
    /// Idempotent while in flight for the same pair: a second caller
    /// (including a concurrent execute) awaits the same stored future
    /// instead of racing a fresh preparation. A request for a different
    /// pair supersedes the stored run, since the queue has moved on and
    /// its result could only fail the staleness check at execute time.
    /// Analyzer and planner both degrade to deterministic fallbacks
    /// internally, so preparation itself cannot fail; a panic simply
    /// leaves no prepared state behind.
    pub async fn prepare_transition(&self, current: Track, next: Track) {
        let future = {
            let mut preparing = self.inner.preparing.lock().await;
            match preparing.as_ref() {
                Some(existing) if existing.is_for(&current.id, &next.id) => {
                    existing.future.clone()
                }
                _ => {
                    let inner = Arc::clone(&self.inner);
                    let from_id = current.id.clone();
                    let to_id = next.id.clone();
                    let future: PrepareFuture = {
                        let from_id = from_id.clone();
                        let to_id = to_id.clone();
                        async move {
                            inner.do_prepare(current, next).await;
                            // Only clear our own slot; a superseding run
                            // may have replaced it already
                            let mut preparing = inner.preparing.lock().await;
                            if preparing
                                .as_ref()
                                .is_some_and(|p| p.is_for(&from_id, &to_id))
                            {
                                preparing.take();
                            }
                        }
                        .boxed()
                        .shared()
                    };
                    *preparing = Some(InFlightPrepare {
                        from_id,
                        to_id,
                        future: future.clone(),
                    });
                    future
                }
            }
        };
        future.await;
    }

    /// Execute the prepared transition, or degrade to a short-fade switch.
    ///
    /// No-op while another execution is in flight. The prepared plan is
    /// taken (and thereby invalidated) unconditionally, then validated
    /// against the live current/next pair before use.
    pub async fn execute_transition(&self) -> Result<(), PlayerError> {
        if self.inner.transitioning.swap(true, Ordering::SeqCst) {
            debug!("transition already in flight, ignoring trigger");
            return Ok(());
        }
        let _guard = TransitionGuard(Arc::clone(&self.inner));

        // Preparation may still be running; await the same instance
        let pending = self
            .inner
            .preparing
            .lock()
            .await
            .as_ref()
            .map(|p| p.future.clone());
        if let Some(future) = pending {
            future.await;
        }

        let prepared = self.inner.prepared.lock().await.take();

        let Some(next) = self.inner.queue.next_up().await else {
            debug!("no next track, nothing to transition to");
            return Ok(());
        };
        let current_id = self.inner.state.current_track().await.map(|t| t.id);

        match prepared {
            Some(p)
                if p.to.id == next.id && current_id.as_deref() == Some(p.from_id.as_str()) =>
            {
                if let Err(e) = self.run_planned(p).await {
                    warn!("planned transition failed ({}), switching directly", e);
                    self.fallback_switch(next).await?;
                }
            }
            Some(stale) => {
                info!(
                    "discarding stale plan {} -> {} (queue changed)",
                    stale.from_id, stale.to.id
                );
                self.fallback_switch(next).await?;
            }
            None => {
                debug!("no prepared plan, switching with a short fade");
                self.fallback_switch(next).await?;
            }
        }
        Ok(())
    }

    /// The planned three-phase sequence: equal-power fade-out, muted
    /// remote switch under bridge filler, equal-power fade-in.
    async fn run_planned(&self, prepared: PreparedTransition) -> Result<(), PlayerError> {
        let PreparedTransition {
            from_id,
            to,
            from_analysis,
            to_analysis,
            plan,
        } = prepared;

        let user_volume = self.inner.state.volume().await;
        let half = Duration::from_secs_f64(plan.duration_secs / 2.0);

        info!(
            "transition {} -> {}: {:?} over {}s",
            from_id, to.id, plan.technique, plan.duration_secs
        );
        self.inner.state.broadcast_event(DjEvent::TransitionStarted {
            from_track_id: from_id,
            to_track_id: to.id.clone(),
            timestamp: chrono::Utc::now(),
        });

        // Phase 1: bridge swells in while the outgoing track fades out
        let use_bridge = plan.generated_elements.any();
        if use_bridge {
            self.inner.bridge.set_volume(0.0);
            self.inner
                .bridge
                .generate_from(&plan, from_analysis.bpm, to_analysis.bpm);
            self.inner
                .bridge
                .fade_to(user_volume * BRIDGE_LEVEL, half.as_millis() as u64);
        }
        self.fade_out(user_volume, half).await?;

        // Phase 2: switch the remote target while audible volume is
        // pinned at zero, so the new stream cannot spike
        if let Err(e) = self.inner.player.play(&to).await {
            // Leave the user on the prior track at their volume
            self.inner.bridge.stop();
            let _ = self.inner.player.set_volume(user_volume).await;
            return Err(e);
        }
        if use_bridge {
            self.inner.bridge.fade_to(0.0, half.as_millis() as u64);
        }

        // Phase 3: the incoming track becomes "current" the moment it is
        // audible, then fades up to the user's level
        self.inner.queue.advance().await;
        self.inner.state.set_current_track(to.clone()).await;
        self.inner
            .state
            .set_playback_state(PlaybackState::Playing)
            .await;
        self.fade_in(user_volume, half).await?;

        self.inner.bridge.stop();
        self.inner
            .state
            .broadcast_event(DjEvent::TransitionCompleted {
                to_track_id: to.id,
                timestamp: chrono::Utc::now(),
            });
        Ok(())
    }

    /// Degraded path: immediate switch with a short equal-power fade.
    async fn fallback_switch(&self, next: Track) -> Result<(), PlayerError> {
        self.inner.bridge.stop();
        let user_volume = self.inner.state.volume().await;

        self.fade_out(user_volume, FALLBACK_FADE).await?;
        if let Err(e) = self.inner.player.play(&next).await {
            let _ = self.inner.player.set_volume(user_volume).await;
            return Err(e);
        }
        self.inner.queue.advance().await;
        self.inner.state.set_current_track(next).await;
        self.inner
            .state
            .set_playback_state(PlaybackState::Playing)
            .await;
        self.fade_in(user_volume, FALLBACK_FADE).await
    }

    /// Drive the audible level from `level` to 0 with the equal-power
    /// cosine curve. Progress is elapsed wall-clock over target duration,
    /// clamped, so the fade terminates under scheduling jitter.
    async fn fade_out(&self, level: f64, duration: Duration) -> Result<(), PlayerError> {
        self.drive_fade(duration, |t| level * segue_common::FadeCurve::EqualPower.fade_out(t))
            .await
    }

    /// Drive the audible level from 0 to `level` with the equal-power
    /// sine curve.
    async fn fade_in(&self, level: f64, duration: Duration) -> Result<(), PlayerError> {
        self.drive_fade(duration, |t| level * segue_common::FadeCurve::EqualPower.fade_in(t))
            .await
    }

    async fn drive_fade(
        &self,
        duration: Duration,
        level_at: impl Fn(f64) -> f64,
    ) -> Result<(), PlayerError> {
        let start = Instant::now();
        let mut ticker = interval(FADE_TICK);
        loop {
            ticker.tick().await;
            let t = (start.elapsed().as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0);
            self.inner.player.set_volume(level_at(t)).await?;
            if t >= 1.0 {
                return Ok(());
            }
        }
    }

    /// True while a transition is executing (for tests and diagnostics).
    pub fn is_transitioning(&self) -> bool {
        self.inner.transitioning.load(Ordering::SeqCst)
    }

    /// Whether a prepared plan is currently held.
    pub async fn has_prepared_plan(&self) -> bool {
        self.inner.prepared.lock().await.is_some()
    }
}

impl EngineInner {
    async fn do_prepare(&self, current: Track, next: Track) {
        debug!("preparing transition {} -> {}", current.id, next.id);
        let from_analysis = self.analyzer.analyze(&current).await;
        let to_analysis = self.analyzer.analyze(&next).await;
        self.state.broadcast_event(DjEvent::AnalysisCompleted {
            track_id: next.id.clone(),
            bpm: to_analysis.bpm,
            energy: to_analysis.energy,
            timestamp: chrono::Utc::now(),
        });
        let plan = self.planner.plan(&from_analysis, &to_analysis).await;

        self.state.broadcast_event(DjEvent::TransitionPrepared {
            from_track_id: current.id.clone(),
            to_track_id: next.id.clone(),
            technique: plan.technique,
            duration_secs: plan.duration_secs,
            timestamp: chrono::Utc::now(),
        });

        *self.prepared.lock().await = Some(PreparedTransition {
            from_id: current.id,
            to: next,
            from_analysis,
            to_analysis,
            plan,
        });
    }
}
