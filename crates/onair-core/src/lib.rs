//! OnAir Core - Live Stream Playback Controller
//!
//! This crate provides the playback lifecycle for a single always-on live
//! stream:
//! - Binding the streaming engine (or native playback) to a media sink
//! - Recovering from fatal engine errors
//! - Serializing play/pause so the sink never sees overlapping requests
//! - Reconciling UI state (playing, buffering, muted, fullscreen,
//!   controls) from the sink's native events
//! - Auto-hiding the controls after an idle window
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          OnAir Core                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   PlayerHandle ──intents──┐                                     │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐            │
//! │  │    Engine    │──│   Player    │──│   Playback   │            │
//! │  │    Binder    │  │ Controller  │  │  Serializer  │            │
//! │  └──────┬───────┘  └──────┬──────┘  └──────┬───────┘            │
//! │         │                 │                │                    │
//! │   StreamingEngine  ┌──────┴──────┐     MediaSink                │
//! │                    │  UI State   │                              │
//! │                    │ Reconciler  │──watch──> presentation       │
//! │                    └─────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod engine;
pub mod media;
pub mod binder;
pub mod serializer;
pub mod reconciler;
pub mod timer;
pub mod controller;
pub mod sim;

pub use error::{Error, PlayRejection, Result};
pub use types::*;
pub use config::{BrandingConfig, EngineConfig, PlayerConfig, RetryLimit};
pub use engine::{EngineEvent, EngineEvents, EngineFactory, ErrorCategory, StreamingEngine};
pub use media::{MediaEvent, MediaSink, Viewport};
pub use binder::{EngineBinder, Recovery};
pub use serializer::{PlayOutcome, PlaybackSerializer};
pub use reconciler::{UiSignal, UiState};
pub use controller::{PlayerController, PlayerHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library initialization
pub fn init() {
    tracing::info!(version = VERSION, "OnAir Core initialized");
}
