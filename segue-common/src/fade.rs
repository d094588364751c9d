//! Fade curve implementations for transitions
//!
//! Each curve is a pure function of normalized position through the fade,
//! so the engine can drive it from wall-clock elapsed time / target
//! duration and tests can sample it without any timers.
//!
//! The default for track handoffs is `EqualPower`: cosine-shaped fade-out
//! paired with a sine-shaped fade-in keeps the perceived combined loudness
//! roughly constant, avoiding the mid-fade dip a linear ramp produces.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Fade curve types
///
/// - Linear: constant rate of change (precise, predictable)
/// - Exponential: slow start, fast finish (natural-sounding fade-in)
/// - Logarithmic: fast start, slow finish (natural-sounding fade-out)
/// - SCurve: smooth acceleration and deceleration
/// - EqualPower: constant perceived loudness during a crossfade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// v(t) = t
    Linear,
    /// v(t) = t² (fade-in), (1-t)² (fade-out)
    Exponential,
    /// v(t) = sqrt(t) (fade-in), fast start for fade-out
    Logarithmic,
    /// v(t) = 0.5 × (1 - cos(π × t))
    SCurve,
    /// v(t) = sin(t × π/2) in, cos(t × π/2) out
    EqualPower,
}

impl FadeCurve {
    /// Fade-in multiplier at normalized position `t` (0.0 start, 1.0 end).
    ///
    /// Returns a volume multiplier in 0.0..=1.0; `t` is clamped so the
    /// result is well defined under scheduling jitter past the deadline.
    pub fn fade_in(&self, position: f64) -> f64 {
        let t = position.clamp(0.0, 1.0);
        match self {
            FadeCurve::Linear => t,
            FadeCurve::Exponential => t * t,
            FadeCurve::Logarithmic => t.sqrt(),
            FadeCurve::SCurve => 0.5 * (1.0 - (std::f64::consts::PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Fade-out multiplier at normalized position `t` (1.0 at start, 0.0 at end).
    pub fn fade_out(&self, position: f64) -> f64 {
        let t = position.clamp(0.0, 1.0);
        match self {
            FadeCurve::Linear => 1.0 - t,
            FadeCurve::Exponential => {
                let inv = 1.0 - t;
                inv * inv
            }
            FadeCurve::Logarithmic => (1.0 - t).sqrt(),
            FadeCurve::SCurve => 0.5 * (1.0 + (std::f64::consts::PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).cos(),
        }
    }

    /// All variants, for config validation and tests.
    pub fn all_variants() -> &'static [FadeCurve] {
        &[
            FadeCurve::Linear,
            FadeCurve::Exponential,
            FadeCurve::Logarithmic,
            FadeCurve::SCurve,
            FadeCurve::EqualPower,
        ]
    }
}

impl Default for FadeCurve {
    fn default() -> Self {
        FadeCurve::EqualPower
    }
}

impl std::fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FadeCurve::Linear => "linear",
            FadeCurve::Exponential => "exponential",
            FadeCurve::Logarithmic => "logarithmic",
            FadeCurve::SCurve => "s_curve",
            FadeCurve::EqualPower => "equal_power",
        };
        write!(f, "{}", name)
    }
}
