//! Configuration loading
//!
//! Bootstrap configuration comes from a TOML file; everything here is
//! static for the life of the process. Resolution order for the file path:
//!
//! 1. Command-line argument (highest priority)
//! 2. `SEGUE_CONFIG` environment variable
//! 3. OS config directory (`~/.config/segue/config.toml` on Linux)
//!
//! A missing file yields built-in defaults so the daemon can start with
//! nothing but environment-supplied credentials.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub bridge: BridgeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            logging: LoggingConfig::default(),
            player: PlayerConfig::default(),
            ai: AiConfig::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Remote player web API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    /// Base URL of the remote player web API
    #[serde(default = "default_player_url")]
    pub base_url: String,

    /// Bearer token for the player API (may also come from env)
    #[serde(default)]
    pub access_token: Option<String>,

    /// Device name announced on activation
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            base_url: default_player_url(),
            access_token: None,
            device_name: default_device_name(),
        }
    }
}

/// AI analysis/planning service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Base URL of the generative AI endpoint
    #[serde(default = "default_ai_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier sent with each request
    #[serde(default = "default_ai_model")]
    pub model: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_ai_url(),
            api_key: None,
            model: default_ai_model(),
            timeout_secs: default_ai_timeout(),
        }
    }
}

/// Bridge audio output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Whether to open a local audio device for bridge filler at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Output device name (None = system default)
    #[serde(default)]
    pub device: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device: None,
        }
    }
}

fn default_port() -> u16 {
    5750
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_player_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_device_name() -> String {
    "Segue AI DJ".to_string()
}

fn default_ai_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_ai_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_ai_timeout() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("invalid TOML in {}: {}", path.display(), e)))
    }

    /// Resolve the config file path and load it, falling back to built-in
    /// defaults when no file exists anywhere in the search order.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            return Self::load_from(path);
        }

        if let Ok(env_path) = std::env::var("SEGUE_CONFIG") {
            return Self::load_from(Path::new(&env_path));
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }
}

/// OS-dependent default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("segue").join("config.toml"))
}
