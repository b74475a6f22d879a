//! Configuration management for the CodeHub client.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use codehub_common::constants::{
    AUTO_SCROLL_EDGE_PX, AUTO_SCROLL_MAX_SPEED, AUTO_SCROLL_MIN_SPEED, DEFAULT_API_BASE_URL,
    DEFAULT_CHALLENGE_TTL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_STUB_LISTEN_ADDR,
    HAPTIC_PULSE_MS, LONG_PRESS_MOVE_TOLERANCE_PX, LONG_PRESS_MS,
};

/// Client configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Task board drag tuning
    #[serde(default)]
    pub board: BoardConfig,

    /// Local stub server settings
    #[serde(default)]
    pub stub: StubConfig,
}

/// REST API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the CodeHub API
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Drag-and-drop tuning for the task board
#[derive(Debug, Clone, Deserialize)]
pub struct BoardConfig {
    /// Touch hold before a drag arms (milliseconds)
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,

    /// Movement that cancels a pending long-press (px)
    #[serde(default = "default_move_tolerance")]
    pub move_tolerance_px: f64,

    /// Auto-scroll edge band (px)
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold_px: f64,

    /// Auto-scroll speed floor (px/frame)
    #[serde(default = "default_min_scroll_speed")]
    pub min_scroll_speed: f64,

    /// Auto-scroll speed ceiling (px/frame)
    #[serde(default = "default_max_scroll_speed")]
    pub max_scroll_speed: f64,

    /// Haptic pulse length on drag arm (milliseconds)
    #[serde(default = "default_haptic_ms")]
    pub haptic_ms: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            long_press_ms: default_long_press_ms(),
            move_tolerance_px: default_move_tolerance(),
            edge_threshold_px: default_edge_threshold(),
            min_scroll_speed: default_min_scroll_speed(),
            max_scroll_speed: default_max_scroll_speed(),
            haptic_ms: default_haptic_ms(),
        }
    }
}

/// Stub API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StubConfig {
    /// HTTP listen address
    #[serde(default = "default_stub_listen_addr")]
    pub listen_addr: String,

    /// Challenge validity in seconds
    #[serde(default = "default_challenge_ttl")]
    pub challenge_ttl_secs: u64,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_stub_listen_addr(),
            challenge_ttl_secs: default_challenge_ttl(),
        }
    }
}

/// Values supplied on the command line, applied after file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub listen_addr: Option<String>,
}

// Default value functions
fn default_api_base_url() -> String { DEFAULT_API_BASE_URL.to_string() }
fn default_request_timeout() -> u64 { DEFAULT_REQUEST_TIMEOUT_SECS }
fn default_long_press_ms() -> u64 { LONG_PRESS_MS }
fn default_move_tolerance() -> f64 { LONG_PRESS_MOVE_TOLERANCE_PX }
fn default_edge_threshold() -> f64 { AUTO_SCROLL_EDGE_PX }
fn default_min_scroll_speed() -> f64 { AUTO_SCROLL_MIN_SPEED }
fn default_max_scroll_speed() -> f64 { AUTO_SCROLL_MAX_SPEED }
fn default_haptic_ms() -> u64 { HAPTIC_PULSE_MS }
fn default_stub_listen_addr() -> String { DEFAULT_STUB_LISTEN_ADDR.to_string() }
fn default_challenge_ttl() -> u64 { DEFAULT_CHALLENGE_TTL_SECS } // 2 minutes

impl ClientConfig {
    /// Load configuration from file and `CODEHUB__*` environment, with CLI overrides
    pub fn load(config_path: &str, overrides: &ConfigOverrides) -> Result<Self> {
        let mut builder = config::Config::builder();

        if Path::new(config_path).exists() {
            builder = builder.add_source(config::File::with_name(config_path));
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("CODEHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        let mut config: Self = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;

        // Apply CLI overrides
        if let Some(ref api_url) = overrides.api_url {
            config.api.base_url = api_url.clone();
        }
        if let Some(ref listen) = overrides.listen_addr {
            config.stub.listen_addr = listen.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject tuning values the drag engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let board = &self.board;
        if board.min_scroll_speed > board.max_scroll_speed {
            anyhow::bail!(
                "board.min_scroll_speed ({}) exceeds board.max_scroll_speed ({})",
                board.min_scroll_speed,
                board.max_scroll_speed
            );
        }
        if board.edge_threshold_px <= 0.0 {
            anyhow::bail!("board.edge_threshold_px must be positive");
        }
        if self.api.request_timeout_secs == 0 {
            anyhow::bail!("api.request_timeout_secs must be at least 1");
        }
        Ok(())
    }
}
