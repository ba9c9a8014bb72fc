//! Player configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Stream used when no source is configured
pub const DEFAULT_STREAM_URL: &str = "https://isaocorp.cloudecast.com/toptv/index.m3u8";

/// MIME type probed on the sink for native HLS playback
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

/// Retry budget for an engine loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryLimit {
    /// Keep retrying forever
    Unbounded,
    /// Give up after this many attempts
    Limited(u32),
}

impl RetryLimit {
    /// Attempt count as an engine would take it (`None` = infinite)
    pub fn attempts(&self) -> Option<u32> {
        match self {
            RetryLimit::Unbounded => None,
            RetryLimit::Limited(n) => Some(*n),
        }
    }
}

/// Settings passed to the streaming engine on construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Enable low-latency live mode
    pub low_latency: bool,
    /// Decode on a background worker
    pub worker_decoding: bool,
    /// Manifest loading retries
    pub manifest_retry: RetryLimit,
    /// Quality-level playlist loading retries
    pub level_retry: RetryLimit,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            low_latency: true,
            worker_decoding: true,
            manifest_retry: RetryLimit::Unbounded,
            level_retry: RetryLimit::Unbounded,
        }
    }
}

/// Channel branding handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandingConfig {
    pub channel_name: String,
    pub logo_url: Option<Url>,
    /// Text under the buffering indicator
    pub loading_label: String,
    /// Text next to the live badge
    pub live_label: String,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            channel_name: "Top TV".to_string(),
            logo_url: Url::parse("https://i.imgur.com/UDgPGcK.png").ok(),
            loading_label: "Carregando Top TV".to_string(),
            live_label: "Transmissão Ao Vivo • HD 1080P".to_string(),
        }
    }
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Live manifest URL
    pub source_url: Url,
    /// Idle time before the controls hide (milliseconds)
    pub idle_timeout_ms: u64,
    /// Brand splash shown before the player mounts (milliseconds)
    pub splash_duration_ms: u64,
    /// MIME type probed for native playback
    pub native_mime_type: String,
    /// Streaming engine settings
    pub engine: EngineConfig,
    /// Branding for the presentation layer
    pub branding: BrandingConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            source_url: Url::parse(DEFAULT_STREAM_URL).expect("default stream URL is valid"),
            idle_timeout_ms: 5000,
            splash_duration_ms: 2500,
            native_mime_type: HLS_MIME_TYPE.to_string(),
            engine: EngineConfig::default(),
            branding: BrandingConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Default configuration for another stream
    pub fn for_source(source_url: Url) -> Self {
        Self {
            source_url,
            ..Default::default()
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn validate(&self) -> Result<()> {
        if self.idle_timeout_ms == 0 {
            return Err(Error::InvalidConfig("idle_timeout_ms must be positive".into()));
        }
        match self.source_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::InvalidConfig(format!(
                    "unsupported source scheme: {other}"
                )))
            }
        }
        if self.native_mime_type.is_empty() {
            return Err(Error::InvalidConfig("native_mime_type is empty".into()));
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn splash_duration(&self) -> Duration {
        Duration::from_millis(self.splash_duration_ms)
    }
}
