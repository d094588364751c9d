//! Transition planner
//!
//! Asks the AI service for a technique/duration/elements recommendation and
//! falls back to deterministic rules on any failure. Every plan, whichever
//! path produced it, passes through [`TransitionPlan::clamped`] so timing
//! can never go out of range.

use crate::ai::{RawPlan, TrackAi};
use segue_common::types::{
    EqCurve, GeneratedElements, TrackAnalysis, TransitionPlan, TransitionTechnique,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Relative bpm difference above which tempo handling gets aggressive
const BPM_DIFF_SWAP: f64 = 0.1;
const BPM_DIFF_ADJUST: f64 = 0.05;

/// Energy gap thresholds for fallback element selection
const ENERGY_DIFF_LONG: f64 = 0.3;
const ENERGY_DIFF_HIHAT: f64 = 0.2;

/// Transition planner
pub struct TransitionPlanner {
    ai: Arc<dyn TrackAi>,
}

impl TransitionPlanner {
    pub fn new(ai: Arc<dyn TrackAi>) -> Self {
        Self { ai }
    }

    /// Plan a transition between two analyzed tracks.
    ///
    /// Never fails: an AI error or malformed recommendation degrades to
    /// the rule-based fallback.
    pub async fn plan(&self, from: &TrackAnalysis, to: &TrackAnalysis) -> TransitionPlan {
        match self.ai.plan_transition(from, to).await {
            Ok(raw) => {
                debug!("AI transition plan: {:?}", raw);
                from_raw(raw, from, to)
            }
            Err(e) => {
                warn!("transition planning failed, using fallback rules: {}", e);
                fallback_plan(from, to)
            }
        }
    }
}

/// Fill gaps in an AI recommendation from the fallback rules, then clamp.
fn from_raw(raw: RawPlan, from: &TrackAnalysis, to: &TrackAnalysis) -> TransitionPlan {
    let fallback = fallback_plan(from, to);

    TransitionPlan {
        duration_secs: raw.duration.unwrap_or(fallback.duration_secs),
        technique: raw
            .technique
            .as_deref()
            .and_then(parse_technique)
            .unwrap_or(fallback.technique),
        bpm_adjustment: raw.bpm_adjustment.unwrap_or(fallback.bpm_adjustment),
        eq_curve: EqCurve::default(),
        generated_elements: raw
            .generated_elements
            .unwrap_or(fallback.generated_elements),
        mix_in_point: raw.mix_in_point.unwrap_or(fallback.mix_in_point),
        mix_out_point: raw.mix_out_point.unwrap_or(fallback.mix_out_point),
    }
    .clamped()
}

fn parse_technique(s: &str) -> Option<TransitionTechnique> {
    match s {
        "crossfade" => Some(TransitionTechnique::Crossfade),
        "bass-swap" => Some(TransitionTechnique::BassSwap),
        "filter-sweep" => Some(TransitionTechnique::FilterSweep),
        "echo-out" => Some(TransitionTechnique::EchoOut),
        "bridge" => Some(TransitionTechnique::Bridge),
        _ => None,
    }
}

/// Deterministic rule-based plan.
///
/// A large bpm gap calls for a bass swap plus a generated kick to carry the
/// groove across the tempo change; a large energy gap calls for a longer
/// blend with riser and bass to build into the incoming track.
pub fn fallback_plan(from: &TrackAnalysis, to: &TrackAnalysis) -> TransitionPlan {
    let bpm_diff = (from.bpm - to.bpm).abs() / from.bpm;
    let energy_diff = (from.energy - to.energy).abs();

    TransitionPlan {
        duration_secs: if energy_diff > ENERGY_DIFF_LONG {
            12.0
        } else {
            8.0
        },
        technique: if bpm_diff > BPM_DIFF_SWAP {
            TransitionTechnique::BassSwap
        } else {
            TransitionTechnique::Crossfade
        },
        bpm_adjustment: bpm_diff > BPM_DIFF_ADJUST,
        eq_curve: EqCurve::default(),
        generated_elements: GeneratedElements {
            kick: bpm_diff > BPM_DIFF_SWAP,
            snare: false,
            hihat: energy_diff > ENERGY_DIFF_HIHAT,
            bass: energy_diff > ENERGY_DIFF_LONG,
            riser: energy_diff > ENERGY_DIFF_LONG,
        },
        mix_in_point: 16.0,
        mix_out_point: 8.0,
    }
    .clamped()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiError, AnalysisRequest, RawAnalysis};
    use async_trait::async_trait;
    use segue_common::types::{
        MIX_IN_MAX, MIX_IN_MIN, MIX_OUT_MAX, MIX_OUT_MIN, TRANSITION_DURATION_MAX,
        TRANSITION_DURATION_MIN,
    };

    struct FixedAi(Result<RawPlan, ()>);

    #[async_trait]
    impl TrackAi for FixedAi {
        async fn analyze_track(&self, _req: &AnalysisRequest) -> Result<RawAnalysis, AiError> {
            Err(AiError::Network("n/a".to_string()))
        }

        async fn plan_transition(
            &self,
            _from: &TrackAnalysis,
            _to: &TrackAnalysis,
        ) -> Result<RawPlan, AiError> {
            self.0
                .clone()
                .map_err(|_| AiError::Network("down".to_string()))
        }
    }

    fn analysis(bpm: f64, energy: f64) -> TrackAnalysis {
        TrackAnalysis {
            bpm,
            energy,
            ..TrackAnalysis::fallback()
        }
    }

    fn assert_in_range(plan: &TransitionPlan) {
        assert!(
            plan.duration_secs >= TRANSITION_DURATION_MIN
                && plan.duration_secs <= TRANSITION_DURATION_MAX
        );
        assert!(plan.mix_in_point >= MIX_IN_MIN && plan.mix_in_point <= MIX_IN_MAX);
        assert!(plan.mix_out_point >= MIX_OUT_MIN && plan.mix_out_point <= MIX_OUT_MAX);
    }

    #[tokio::test]
    async fn ai_plan_is_clamped() {
        let planner = TransitionPlanner::new(Arc::new(FixedAi(Ok(RawPlan {
            duration: Some(90.0),
            technique: Some("bridge".to_string()),
            mix_in_point: Some(2.0),
            mix_out_point: Some(100.0),
            ..Default::default()
        }))));

        let plan = planner
            .plan(&analysis(120.0, 0.5), &analysis(124.0, 0.55))
            .await;
        assert_eq!(plan.technique, TransitionTechnique::Bridge);
        assert_in_range(&plan);
    }

    #[tokio::test]
    async fn unknown_technique_falls_back() {
        let planner = TransitionPlanner::new(Arc::new(FixedAi(Ok(RawPlan {
            technique: Some("teleport".to_string()),
            ..Default::default()
        }))));

        let plan = planner
            .plan(&analysis(120.0, 0.5), &analysis(121.0, 0.5))
            .await;
        assert_eq!(plan.technique, TransitionTechnique::Crossfade);
    }

    #[tokio::test]
    async fn close_tracks_get_a_short_crossfade() {
        // 120 -> 124 bpm (diff ~3.3%), energy 0.5 -> 0.55
        let planner = TransitionPlanner::new(Arc::new(FixedAi(Err(()))));
        let plan = planner
            .plan(&analysis(120.0, 0.5), &analysis(124.0, 0.55))
            .await;

        assert_eq!(plan.technique, TransitionTechnique::Crossfade);
        assert!(!plan.generated_elements.kick);
        assert!(!plan.generated_elements.snare);
        // 8s rule result is clamped up to the 10s floor
        assert_eq!(plan.duration_secs, TRANSITION_DURATION_MIN);
        assert_in_range(&plan);
    }

    #[tokio::test]
    async fn energy_jump_gets_long_blend_with_riser_and_bass() {
        let planner = TransitionPlanner::new(Arc::new(FixedAi(Err(()))));
        let plan = planner
            .plan(&analysis(120.0, 0.3), &analysis(120.0, 0.9))
            .await;

        assert_eq!(plan.duration_secs, 12.0);
        assert!(plan.generated_elements.riser);
        assert!(plan.generated_elements.bass);
        assert!(plan.generated_elements.hihat);
        assert_in_range(&plan);
    }

    #[tokio::test]
    async fn big_bpm_gap_swaps_bass_and_adds_kick() {
        let planner = TransitionPlanner::new(Arc::new(FixedAi(Err(()))));
        let plan = planner
            .plan(&analysis(120.0, 0.5), &analysis(170.0, 0.5))
            .await;

        assert_eq!(plan.technique, TransitionTechnique::BassSwap);
        assert!(plan.bpm_adjustment);
        assert!(plan.generated_elements.kick);
        assert_in_range(&plan);
    }

    #[test]
    fn fallback_is_always_in_range_over_a_grid() {
        for bpm_a in [60.0, 90.0, 120.0, 180.0] {
            for bpm_b in [60.0, 120.0, 180.0] {
                for e_a in [0.0, 0.5, 1.0] {
                    for e_b in [0.0, 0.5, 1.0] {
                        let plan = fallback_plan(&analysis(bpm_a, e_a), &analysis(bpm_b, e_b));
                        assert_in_range(&plan);
                    }
                }
            }
        }
    }
}
