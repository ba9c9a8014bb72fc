//! Media sink and viewport capabilities
//!
//! The controller never touches a platform video element directly. Hosts
//! implement [`MediaSink`] over their playback element and [`Viewport`]
//! over the container that can enter fullscreen.

use crate::error::PlayRejection;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use url::Url;

/// Native events emitted by a media sink
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MediaEvent {
    /// Playback was requested and the sink left the paused state
    Play,
    /// The sink paused
    Pause,
    /// Playback stalled on an empty buffer
    Waiting,
    /// Playback resumed after a stall
    Playing,
    /// Mute flag or volume changed; carries the values at emission time
    VolumeChange { muted: bool, volume: f64 },
    /// Stream metadata is available
    LoadedMetadata,
}

impl std::fmt::Display for MediaEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaEvent::Play => write!(f, "play"),
            MediaEvent::Pause => write!(f, "pause"),
            MediaEvent::Waiting => write!(f, "waiting"),
            MediaEvent::Playing => write!(f, "playing"),
            MediaEvent::VolumeChange { .. } => write!(f, "volumechange"),
            MediaEvent::LoadedMetadata => write!(f, "loadedmetadata"),
        }
    }
}

/// Playback element accepting decoded media
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Start playback; resolves once the sink accepted or refused
    async fn play(&self) -> std::result::Result<(), PlayRejection>;

    fn pause(&self);

    fn paused(&self) -> bool;

    fn muted(&self) -> bool;

    fn set_muted(&self, muted: bool);

    /// Volume in `0.0..=1.0`
    fn volume(&self) -> f64;

    /// Whether the sink can decode this MIME type itself
    fn can_play_type(&self, mime_type: &str) -> bool;

    /// Point the sink directly at a stream URL
    fn set_source(&self, url: &Url);

    /// Subscribe to native events
    fn subscribe(&self) -> broadcast::Receiver<MediaEvent>;
}

/// Container able to enter and leave fullscreen
#[async_trait]
pub trait Viewport: Send + Sync {
    async fn request_fullscreen(&self) -> std::result::Result<(), String>;

    async fn exit_fullscreen(&self) -> std::result::Result<(), String>;

    /// Ground truth: is any element fullscreen right now
    fn is_fullscreen(&self) -> bool;

    /// Document-level fullscreen-change signal
    fn fullscreen_changes(&self) -> watch::Receiver<bool>;
}
