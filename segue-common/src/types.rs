//! Core domain types for the Segue transition pipeline
//!
//! `Track` is what the queue holds, `TrackAnalysis` is what the analyzer
//! derives (and caches) per track, and `TransitionPlan` is the ephemeral
//! output of the planner, consumed exactly once by the transition engine.

use serde::{Deserialize, Serialize};

/// Valid tempo range for analysis results (bpm)
pub const BPM_MIN: f64 = 60.0;
pub const BPM_MAX: f64 = 180.0;

/// Valid transition duration range (seconds)
pub const TRANSITION_DURATION_MIN: f64 = 10.0;
pub const TRANSITION_DURATION_MAX: f64 = 30.0;

/// Valid mix-in point range: seconds before the outgoing track ends
pub const MIX_IN_MIN: f64 = 15.0;
pub const MIX_IN_MAX: f64 = 30.0;

/// Valid mix-out point range: seconds into the incoming track
pub const MIX_OUT_MIN: f64 = 8.0;
pub const MIX_OUT_MAX: f64 = 16.0;

/// A playable track from the remote catalogue.
///
/// Immutable once created; owned by the playback queue. The `id` is the
/// remote service's track identifier and keys the analysis cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    /// Playable reference understood by the remote player (URI or URL)
    pub audio_url: String,
    /// Total duration in seconds
    pub duration_secs: f64,
    /// Free-form vibe tag, used as an analysis hint
    #[serde(default)]
    pub vibe: Option<String>,
    /// Known tempo, if the catalogue already provides one
    #[serde(default)]
    pub bpm: Option<f64>,
}

/// Structural landmarks of a track, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackStructure {
    /// Intro duration
    pub intro_secs: f64,
    /// Outro duration
    pub outro_secs: f64,
    /// Timestamp of the main drop/chorus
    pub drop_secs: f64,
    /// Inferred: track ends with a fade rather than a hard stop
    pub has_fade_out: bool,
    /// Inferred: track opens on the beat (short or no intro)
    pub starts_with_beat: bool,
}

/// Derived musical characterization of a track.
///
/// Created lazily on first analysis, cached per track id, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackAnalysis {
    /// Tempo, clamped to [`BPM_MIN`]..=[`BPM_MAX`]
    pub bpm: f64,
    /// Harmonic-mixing key in Camelot notation (e.g. "8A")
    pub key: String,
    /// Perceived energy, 0.0-1.0
    pub energy: f64,
    pub genre: String,
    pub mood: String,
    pub structure: TrackStructure,
}

impl TrackAnalysis {
    /// Fixed fallback used whenever the AI service fails.
    ///
    /// Analysis must never block playback, so this stands in for any
    /// unreachable or malformed response.
    pub fn fallback() -> Self {
        Self {
            bpm: 120.0,
            key: "8A".to_string(),
            energy: 0.5,
            genre: "Unknown".to_string(),
            mood: "neutral".to_string(),
            structure: TrackStructure {
                intro_secs: 8.0,
                outro_secs: 16.0,
                drop_secs: 32.0,
                has_fade_out: false,
                starts_with_beat: true,
            },
        }
    }
}

/// Mixing technique selected by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionTechnique {
    Crossfade,
    BassSwap,
    FilterSweep,
    EchoOut,
    Bridge,
}

impl Default for TransitionTechnique {
    fn default() -> Self {
        TransitionTechnique::Crossfade
    }
}

/// EQ intent for the low band during the blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LowEq {
    Swap,
    Cut,
    Boost,
}

/// EQ intent for the mid band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MidEq {
    Neutral,
    Cut,
}

/// EQ intent for the high band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighEq {
    Swap,
    Neutral,
}

/// Three-band EQ intent for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqCurve {
    pub low: LowEq,
    pub mid: MidEq,
    pub high: HighEq,
}

impl Default for EqCurve {
    fn default() -> Self {
        Self {
            low: LowEq::Swap,
            mid: MidEq::Neutral,
            high: HighEq::Neutral,
        }
    }
}

/// Which synthetic filler layers the bridge generator should run.
///
/// Each flag is independent; all false means the transition is a pure
/// crossfade with no generated content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedElements {
    pub kick: bool,
    pub snare: bool,
    pub hihat: bool,
    pub bass: bool,
    pub riser: bool,
}

impl GeneratedElements {
    pub fn any(&self) -> bool {
        self.kick || self.snare || self.hihat || self.bass || self.riser
    }
}

/// Plan for one transition between a specific pair of tracks.
///
/// Lifecycle: created during prepare, consumed exactly once during
/// execute, then discarded. Must never be applied to a different pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionPlan {
    /// Total blend duration in seconds, clamped to
    /// [`TRANSITION_DURATION_MIN`]..=[`TRANSITION_DURATION_MAX`]
    pub duration_secs: f64,
    pub technique: TransitionTechnique,
    /// Whether the bridge should ramp tempo between the two tracks
    pub bpm_adjustment: bool,
    pub eq_curve: EqCurve,
    pub generated_elements: GeneratedElements,
    /// Seconds before the outgoing track ends at which to begin mixing
    pub mix_in_point: f64,
    /// Seconds into the incoming track at which the blend resolves
    pub mix_out_point: f64,
}

impl TransitionPlan {
    /// Clamp every timing field into its valid range.
    ///
    /// Applied to both AI-produced and fallback plans so no path can
    /// yield negative or overlapping fades.
    pub fn clamped(mut self) -> Self {
        self.duration_secs = self
            .duration_secs
            .clamp(TRANSITION_DURATION_MIN, TRANSITION_DURATION_MAX);
        self.mix_in_point = self.mix_in_point.clamp(MIX_IN_MIN, MIX_IN_MAX);
        self.mix_out_point = self.mix_out_point.clamp(MIX_OUT_MIN, MIX_OUT_MAX);
        self
    }
}
