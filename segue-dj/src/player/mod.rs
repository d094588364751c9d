//! Remote playback capability
//!
//! The engine drives playback through the [`RemotePlayer`] trait; the
//! production implementation ([`connect::ConnectPlayer`]) speaks to a
//! Connect-style web API where the actual audio plays on a remote device.
//! Calls are latency-bearing and can fail transiently (device not yet
//! activated, expired token), which is why [`retry`] exists.

pub mod connect;
pub mod retry;

pub use connect::ConnectPlayer;

use async_trait::async_trait;
use segue_common::types::Track;
use thiserror::Error;

/// Remote player errors
#[derive(Debug, Clone, Error)]
pub enum PlayerError {
    /// Remote device not ready or not activated (HTTP 404 from the API).
    /// Retryable after a device activation call.
    #[error("remote device not ready")]
    DeviceNotReady,

    /// Access token expired or missing (HTTP 401). Retryable once the
    /// token has been refreshed externally.
    #[error("authentication expired")]
    AuthExpired,

    /// The account cannot perform this action (HTTP 403, e.g. no premium
    /// subscription). Never retryable.
    #[error("operation forbidden by remote service")]
    Forbidden,

    /// Other API error
    #[error("player API error {0}: {1}")]
    Api(u16, String),

    /// Network communication error
    #[error("network error: {0}")]
    Network(String),
}

impl PlayerError {
    /// Whether a bounded retry may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlayerError::DeviceNotReady | PlayerError::AuthExpired | PlayerError::Network(_)
        )
    }
}

/// Snapshot of remote playback state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerState {
    pub paused: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub track_id: Option<String>,
}

/// Remote playback capability consumed by the engine and monitor.
#[async_trait]
pub trait RemotePlayer: Send + Sync {
    /// Start playing a track on the remote device.
    async fn play(&self, track: &Track) -> Result<(), PlayerError>;

    async fn pause(&self) -> Result<(), PlayerError>;

    async fn resume(&self) -> Result<(), PlayerError>;

    /// Set the audible output level, 0.0-1.0.
    async fn set_volume(&self, volume: f64) -> Result<(), PlayerError>;

    /// Poll current playback state.
    async fn fetch_state(&self) -> Result<PlayerState, PlayerError>;
}
