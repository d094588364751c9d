//! Generative AI HTTP client
//!
//! Talks to a Gemini-style `generateContent` endpoint. Prompts ask for raw
//! JSON; models still wrap answers in markdown fences often enough that the
//! response text is stripped before parsing.

use super::{AiError, AnalysisRequest, RawAnalysis, RawPlan, TrackAi};
use async_trait::async_trait;
use segue_common::config::AiConfig;
use segue_common::types::TrackAnalysis;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Client for the generative AI analysis/planning service
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl LlmClient {
    /// Build a client from config. A missing API key is allowed here;
    /// requests will fail with `AiError::NotConfigured`, which callers
    /// already treat as "use the fallback".
    pub fn new(config: &AiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Send one prompt, return the model's text reply.
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AiError::NotConfigured("no AI API key".to_string()))?;

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, api_key
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("AI request failed: {} {}", status, text);
            return Err(AiError::Api(status.as_u16(), text));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        value["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AiError::Parse("no text in response".to_string()))
    }

    fn analysis_prompt(request: &AnalysisRequest) -> String {
        let vibe_line = request
            .vibe
            .as_deref()
            .map(|v| format!("Context vibe: \"{}\"\n", v))
            .unwrap_or_default();

        format!(
            "You are an expert music analyst and DJ.\n\
             Analyze this track from your knowledge of it:\n\
             Track: \"{}\" by {}\n{}\
             Return ONLY a raw JSON object (no markdown fences) with fields:\n\
             - bpm: number (beats per minute)\n\
             - key: string (Camelot notation, e.g. \"8A\")\n\
             - energy: number (0 to 1)\n\
             - genre: string\n\
             - mood: string\n\
             - structure: object with intro, outro, drop (all seconds)",
            request.title, request.artist, vibe_line
        )
    }

    fn plan_prompt(from: &TrackAnalysis, to: &TrackAnalysis) -> String {
        format!(
            "You are an expert DJ planning a transition between two tracks.\n\
             Outgoing: bpm {}, key {}, energy {}, genre {}, outro {}s\n\
             Incoming: bpm {}, key {}, energy {}, genre {}, intro {}s\n\
             Return ONLY a raw JSON object (no markdown fences) with fields:\n\
             - duration: number (seconds, 10-30)\n\
             - technique: one of \"crossfade\", \"bass-swap\", \"filter-sweep\", \"echo-out\", \"bridge\"\n\
             - bpmAdjustment: boolean\n\
             - generatedElements: object with booleans kick, snare, hihat, bass, riser\n\
             - mixInPoint: number (seconds before outgoing track ends, 15-30)\n\
             - mixOutPoint: number (seconds into incoming track, 8-16)",
            from.bpm,
            from.key,
            from.energy,
            from.genre,
            from.structure.outro_secs,
            to.bpm,
            to.key,
            to.energy,
            to.genre,
            to.structure.intro_secs,
        )
    }
}

/// Strip markdown code fences the model may wrap around JSON output.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

#[async_trait]
impl TrackAi for LlmClient {
    async fn analyze_track(&self, request: &AnalysisRequest) -> Result<RawAnalysis, AiError> {
        let text = self.generate(&Self::analysis_prompt(request)).await?;
        debug!("AI analysis reply: {}", text);
        serde_json::from_str(strip_fences(&text)).map_err(|e| AiError::Parse(e.to_string()))
    }

    async fn plan_transition(
        &self,
        from: &TrackAnalysis,
        to: &TrackAnalysis,
    ) -> Result<RawPlan, AiError> {
        let text = self.generate(&Self::plan_prompt(from, to)).await?;
        debug!("AI plan reply: {}", text);
        serde_json::from_str(strip_fences(&text)).map_err(|e| AiError::Parse(e.to_string()))
    }
}
