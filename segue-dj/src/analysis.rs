//! Track analyzer with per-track caching
//!
//! Wraps the AI capability with a cache keyed by track id and range
//! clamping on everything the model returns. Analysis must never block or
//! break playback: any AI failure resolves to a fixed fallback analysis.

use crate::ai::{AnalysisRequest, RawAnalysis, TrackAi};
use segue_common::types::{Track, TrackAnalysis, TrackStructure, BPM_MAX, BPM_MIN};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// An outro longer than this implies the track fades out rather than
/// stopping hard; an intro shorter than ON_BEAT_INTRO_SECS implies the
/// track opens on the beat.
const FADE_OUT_OUTRO_SECS: f64 = 8.0;
const ON_BEAT_INTRO_SECS: f64 = 4.0;

/// Cached track analyzer
pub struct TrackAnalyzer {
    ai: Arc<dyn TrackAi>,
    cache: RwLock<HashMap<String, TrackAnalysis>>,
}

impl TrackAnalyzer {
    pub fn new(ai: Arc<dyn TrackAi>) -> Self {
        Self {
            ai,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Analyze a track, idempotent per track id.
    ///
    /// First call for an id invokes the AI service; subsequent calls return
    /// the cached value without another call. An AI failure yields
    /// [`TrackAnalysis::fallback`] (which is also cached, so a flaky
    /// service is not hammered once per poll tick).
    pub async fn analyze(&self, track: &Track) -> TrackAnalysis {
        if let Some(cached) = self.cache.read().await.get(&track.id) {
            debug!("analysis cache hit for {}", track.id);
            return cached.clone();
        }

        let request = AnalysisRequest {
            title: track.title.clone(),
            artist: track.artist.clone(),
            vibe: track.vibe.clone(),
        };

        let analysis = match self.ai.analyze_track(&request).await {
            Ok(raw) => {
                let analysis = clamp_raw(raw);
                info!(
                    "analyzed \"{}\": {} bpm, key {}, energy {:.2}",
                    track.title, analysis.bpm, analysis.key, analysis.energy
                );
                analysis
            }
            Err(e) => {
                warn!("track analysis failed for \"{}\": {}", track.title, e);
                TrackAnalysis::fallback()
            }
        };

        self.cache
            .write()
            .await
            .insert(track.id.clone(), analysis.clone());
        analysis
    }

    /// Cached analysis for a track id, without triggering an AI call.
    pub async fn cached(&self, track_id: &str) -> Option<TrackAnalysis> {
        self.cache.read().await.get(track_id).cloned()
    }

    /// Drop all cached analyses. No partial invalidation.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    #[cfg(test)]
    pub async fn cache_len(&self) -> usize {
        self.cache.read().await.len()
    }
}

/// Clamp an untrusted AI response into a valid analysis.
fn clamp_raw(raw: RawAnalysis) -> TrackAnalysis {
    let fallback = TrackAnalysis::fallback();
    let structure = raw.structure.unwrap_or_default();

    let intro_secs = structure
        .intro
        .unwrap_or(fallback.structure.intro_secs)
        .max(0.0);
    let outro_secs = structure
        .outro
        .unwrap_or(fallback.structure.outro_secs)
        .max(0.0);
    let drop_secs = structure
        .drop
        .unwrap_or(fallback.structure.drop_secs)
        .max(0.0);

    let genre = raw.genre.unwrap_or(fallback.genre);
    TrackAnalysis {
        bpm: raw.bpm.unwrap_or(fallback.bpm).clamp(BPM_MIN, BPM_MAX),
        key: raw.key.unwrap_or(fallback.key),
        energy: raw.energy.unwrap_or(fallback.energy).clamp(0.0, 1.0),
        mood: raw.mood.unwrap_or_else(|| genre.clone()),
        genre,
        structure: TrackStructure {
            intro_secs,
            outro_secs,
            drop_secs,
            has_fade_out: outro_secs > FADE_OUT_OUTRO_SECS,
            starts_with_beat: intro_secs < ON_BEAT_INTRO_SECS,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiError, RawPlan, RawStructure};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAi {
        calls: AtomicUsize,
        response: Option<RawAnalysis>,
    }

    #[async_trait]
    impl TrackAi for CountingAi {
        async fn analyze_track(&self, _req: &AnalysisRequest) -> Result<RawAnalysis, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .clone()
                .ok_or_else(|| AiError::Network("unreachable".to_string()))
        }

        async fn plan_transition(
            &self,
            _from: &TrackAnalysis,
            _to: &TrackAnalysis,
        ) -> Result<RawPlan, AiError> {
            Err(AiError::Network("unreachable".to_string()))
        }
    }

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: "Test Track".to_string(),
            artist: "Test Artist".to_string(),
            cover_url: None,
            audio_url: format!("remote:track:{}", id),
            duration_secs: 200.0,
            vibe: None,
            bpm: None,
        }
    }

    #[tokio::test]
    async fn second_call_is_a_cache_hit() {
        let ai = Arc::new(CountingAi {
            calls: AtomicUsize::new(0),
            response: Some(RawAnalysis {
                bpm: Some(128.0),
                ..Default::default()
            }),
        });
        let analyzer = TrackAnalyzer::new(ai.clone());

        let first = analyzer.analyze(&track("t1")).await;
        let second = analyzer.analyze(&track("t1")).await;

        assert_eq!(first, second);
        assert_eq!(ai.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_yields_fixed_fallback() {
        let ai = Arc::new(CountingAi {
            calls: AtomicUsize::new(0),
            response: None,
        });
        let analyzer = TrackAnalyzer::new(ai);

        let analysis = analyzer.analyze(&track("t2")).await;
        assert_eq!(analysis, TrackAnalysis::fallback());
        assert_eq!(analysis.bpm, 120.0);
        assert_eq!(analysis.energy, 0.5);
    }

    #[tokio::test]
    async fn out_of_range_values_are_clamped() {
        let ai = Arc::new(CountingAi {
            calls: AtomicUsize::new(0),
            response: Some(RawAnalysis {
                bpm: Some(300.0),
                energy: Some(1.8),
                structure: Some(RawStructure {
                    intro: Some(-5.0),
                    outro: Some(20.0),
                    drop: None,
                }),
                ..Default::default()
            }),
        });
        let analyzer = TrackAnalyzer::new(ai);

        let analysis = analyzer.analyze(&track("t3")).await;
        assert_eq!(analysis.bpm, BPM_MAX);
        assert_eq!(analysis.energy, 1.0);
        assert_eq!(analysis.structure.intro_secs, 0.0);
        // Derived flags follow the clamped structure
        assert!(analysis.structure.has_fade_out);
        assert!(analysis.structure.starts_with_beat);
    }

    #[tokio::test]
    async fn clear_cache_resets_everything() {
        let ai = Arc::new(CountingAi {
            calls: AtomicUsize::new(0),
            response: Some(RawAnalysis::default()),
        });
        let analyzer = TrackAnalyzer::new(ai.clone());

        analyzer.analyze(&track("a")).await;
        analyzer.analyze(&track("b")).await;
        assert_eq!(analyzer.cache_len().await, 2);

        analyzer.clear_cache().await;
        assert_eq!(analyzer.cache_len().await, 0);

        analyzer.analyze(&track("a")).await;
        assert_eq!(ai.calls.load(Ordering::SeqCst), 3);
    }
}
