//! Connect-style remote player client
//!
//! Drives playback on a remote device through a web API in the shape of
//! the Spotify Connect endpoints: this process never touches the track
//! audio itself, it only issues control calls against `/me/player`.
//!
//! A 404 on a playback call means the remote device has not been activated
//! as the playback target yet; the client issues a transfer call and lets
//! the retry layer re-attempt. A 401 means the bearer token expired and
//! some external process must rotate it via [`ConnectPlayer::set_access_token`].

use super::retry::{retry_with_backoff, RetryPolicy};
use super::{PlayerError, PlayerState, RemotePlayer};
use async_trait::async_trait;
use segue_common::config::PlayerConfig;
use segue_common::types::Track;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote player client over a Connect-style web API
pub struct ConnectPlayer {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
    device_name: String,
    /// Device id assigned by the remote service once registered
    device_id: RwLock<Option<String>>,
    retry: RetryPolicy,
}

/// `GET /me/player` response, reduced to what the monitor needs
#[derive(Debug, Deserialize)]
struct ApiPlayerState {
    is_playing: bool,
    progress_ms: Option<u64>,
    item: Option<ApiItem>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    id: String,
    duration_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ApiDevices {
    devices: Vec<ApiDevice>,
}

#[derive(Debug, Deserialize)]
struct ApiDevice {
    id: String,
    name: String,
}

impl ConnectPlayer {
    pub fn new(config: &PlayerConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(config.access_token.clone()),
            device_name: config.device_name.clone(),
            device_id: RwLock::new(None),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the bearer token (external auth refresh).
    pub async fn set_access_token(&self, token: String) {
        *self.token.write().await = Some(token);
    }

    async fn bearer(&self) -> Result<String, PlayerError> {
        self.token
            .read()
            .await
            .clone()
            .ok_or(PlayerError::AuthExpired)
    }

    fn classify(status: reqwest::StatusCode, body: String) -> PlayerError {
        match status.as_u16() {
            401 => PlayerError::AuthExpired,
            403 => PlayerError::Forbidden,
            404 => PlayerError::DeviceNotReady,
            code => PlayerError::Api(code, body),
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PlayerError> {
        let token = self.bearer().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PlayerError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Self::classify(status, body))
        }
    }

    /// Look up this daemon's device and transfer playback to it.
    ///
    /// Called when a playback command reports the device missing; the
    /// follow-up retry then lands on the activated device.
    async fn activate_device(&self) -> Result<(), PlayerError> {
        let url = format!("{}/me/player/devices", self.base_url);
        let devices: ApiDevices = self
            .send(self.http.get(&url))
            .await?
            .json()
            .await
            .map_err(|e| PlayerError::Network(e.to_string()))?;

        let device = devices
            .devices
            .into_iter()
            .find(|d| d.name == self.device_name)
            .ok_or(PlayerError::DeviceNotReady)?;

        info!("activating remote device {} ({})", device.name, device.id);
        let transfer_url = format!("{}/me/player", self.base_url);
        self.send(
            self.http
                .put(&transfer_url)
                .json(&json!({ "device_ids": [device.id], "play": false })),
        )
        .await?;

        *self.device_id.write().await = Some(device.id);
        Ok(())
    }

    /// One play attempt; the public `play` wraps this in retry + activation.
    async fn play_once(&self, track: &Track) -> Result<(), PlayerError> {
        let mut url = format!("{}/me/player/play", self.base_url);
        if let Some(device_id) = self.device_id.read().await.as_deref() {
            url = format!("{}?device_id={}", url, device_id);
        }

        self.send(
            self.http
                .put(&url)
                .json(&json!({ "uris": [track.audio_url] })),
        )
        .await?;

        debug!("playback started: {} ({})", track.title, track.audio_url);
        Ok(())
    }
}

#[async_trait]
impl RemotePlayer for ConnectPlayer {
    async fn play(&self, track: &Track) -> Result<(), PlayerError> {
        retry_with_backoff(
            self.retry,
            || async {
                match self.play_once(track).await {
                    Err(PlayerError::DeviceNotReady) => {
                        warn!("remote device not ready, attempting activation");
                        self.activate_device().await?;
                        self.play_once(track).await
                    }
                    other => other,
                }
            },
            PlayerError::is_retryable,
        )
        .await
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        let url = format!("{}/me/player/pause", self.base_url);
        self.send(self.http.put(&url)).await?;
        Ok(())
    }

    async fn resume(&self) -> Result<(), PlayerError> {
        let url = format!("{}/me/player/play", self.base_url);
        self.send(self.http.put(&url)).await?;
        Ok(())
    }

    async fn set_volume(&self, volume: f64) -> Result<(), PlayerError> {
        let percent = (volume.clamp(0.0, 1.0) * 100.0).round() as u8;
        let url = format!(
            "{}/me/player/volume?volume_percent={}",
            self.base_url, percent
        );
        self.send(self.http.put(&url)).await?;
        Ok(())
    }

    async fn fetch_state(&self) -> Result<PlayerState, PlayerError> {
        let url = format!("{}/me/player", self.base_url);
        let response = self.send(self.http.get(&url)).await?;

        // 204 means no active playback session
        if response.status().as_u16() == 204 {
            return Ok(PlayerState {
                paused: true,
                ..Default::default()
            });
        }

        let api: ApiPlayerState = response
            .json()
            .await
            .map_err(|e| PlayerError::Network(e.to_string()))?;

        Ok(PlayerState {
            paused: !api.is_playing,
            position_ms: api.progress_ms.unwrap_or(0),
            duration_ms: api.item.as_ref().map(|i| i.duration_ms).unwrap_or(0),
            track_id: api.item.map(|i| i.id),
        })
    }
}
