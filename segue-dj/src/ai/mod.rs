//! AI capability interface for analysis and planning
//!
//! The analyzer and planner consume a generative AI service through the
//! [`TrackAi`] trait. Responses are structurally untrusted: every field of
//! the raw types is optional and unclamped, and callers are responsible for
//! validating ranges and falling back when a call fails. The production
//! implementation is [`llm::LlmClient`]; tests substitute in-memory fakes.

pub mod llm;

pub use llm::LlmClient;

use async_trait::async_trait;
use segue_common::types::{GeneratedElements, TrackAnalysis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// AI service errors
#[derive(Debug, Error)]
pub enum AiError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// AI service returned an error response
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Response text was not the expected JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// No API key configured
    #[error("AI service not configured: {0}")]
    NotConfigured(String),
}

/// Hints sent with an analysis request.
///
/// Deliberately metadata-only: the AI never sees audio, it reasons from
/// title/artist knowledge plus the optional vibe tag.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub title: String,
    pub artist: String,
    pub vibe: Option<String>,
}

/// Structure section of a raw analysis response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawStructure {
    pub intro: Option<f64>,
    pub outro: Option<f64>,
    pub drop: Option<f64>,
}

/// Unvalidated analysis response from the AI service
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAnalysis {
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub energy: Option<f64>,
    pub genre: Option<String>,
    pub mood: Option<String>,
    pub structure: Option<RawStructure>,
}

/// Unvalidated transition plan response from the AI service
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPlan {
    pub duration: Option<f64>,
    pub technique: Option<String>,
    #[serde(rename = "bpmAdjustment", alias = "bpm_adjustment")]
    pub bpm_adjustment: Option<bool>,
    #[serde(rename = "generatedElements", alias = "generated_elements")]
    pub generated_elements: Option<GeneratedElements>,
    #[serde(rename = "mixInPoint", alias = "mix_in_point")]
    pub mix_in_point: Option<f64>,
    #[serde(rename = "mixOutPoint", alias = "mix_out_point")]
    pub mix_out_point: Option<f64>,
}

/// AI analysis and planning capability.
///
/// Both calls may fail at any time (network, quota, malformed output);
/// callers must treat them as unreliable and never let a failure reach
/// playback.
#[async_trait]
pub trait TrackAi: Send + Sync {
    /// Characterize a track from its metadata hints.
    async fn analyze_track(&self, request: &AnalysisRequest) -> Result<RawAnalysis, AiError>;

    /// Recommend a transition between two analyzed tracks.
    async fn plan_transition(
        &self,
        from: &TrackAnalysis,
        to: &TrackAnalysis,
    ) -> Result<RawPlan, AiError>;
}
