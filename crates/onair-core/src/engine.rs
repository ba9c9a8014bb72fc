//! Streaming engine capability
//!
//! The adaptive-streaming engine (manifest loading, demuxing, decoding) is
//! external. The controller is handed an [`EngineFactory`] once, at
//! construction, and builds one [`StreamingEngine`] per binding.

use crate::{config::EngineConfig, media::MediaSink, types::Generation, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Category of an engine error
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Manifest, playlist or segment fetch failed
    Network,
    /// Decoding or buffer append failed
    Media,
    /// Anything else (key system, mux, internal ...)
    Other(String),
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Media => write!(f, "media"),
            ErrorCategory::Other(kind) => write!(f, "other({kind})"),
        }
    }
}

/// Events an engine reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    ManifestParsed,
    Error {
        fatal: bool,
        category: ErrorCategory,
        details: String,
    },
}

impl EngineEvent {
    pub fn fatal(category: ErrorCategory, details: impl Into<String>) -> Self {
        EngineEvent::Error {
            fatal: true,
            category,
            details: details.into(),
        }
    }

    pub fn non_fatal(category: ErrorCategory, details: impl Into<String>) -> Self {
        EngineEvent::Error {
            fatal: false,
            category,
            details: details.into(),
        }
    }
}

/// Engine event tagged with the binding that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSignal {
    pub generation: Generation,
    pub event: EngineEvent,
}

/// Emitter handed to an engine at construction.
///
/// Events are tagged with the binding generation; once the binding is torn
/// down the controller drops anything still arriving from it.
#[derive(Debug, Clone)]
pub struct EngineEvents {
    generation: Generation,
    tx: mpsc::UnboundedSender<EngineSignal>,
}

impl EngineEvents {
    pub fn new(generation: Generation, tx: mpsc::UnboundedSender<EngineSignal>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Report an event; returns false once nobody is listening
    pub fn emit(&self, event: EngineEvent) -> bool {
        self.tx
            .send(EngineSignal {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// One live engine instance bound to one sink
pub trait StreamingEngine: Send {
    fn load_source(&mut self, url: &Url) -> Result<()>;

    fn attach_media(&mut self, sink: Arc<dyn MediaSink>) -> Result<()>;

    /// Restart loading after a fatal network error
    fn resume_load(&mut self);

    /// Run the engine's built-in media error recovery
    fn recover_media_error(&mut self);

    /// Detach from the sink and release every resource
    fn destroy(&mut self);
}

/// Constructs engines; injected once when the controller is built
pub trait EngineFactory: Send + Sync {
    /// Whether the engine can run in this environment
    fn is_supported(&self) -> bool;

    fn construct(&self, config: &EngineConfig, events: EngineEvents) -> Result<Box<dyn StreamingEngine>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_tagged() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = EngineEvents::new(Generation(3), tx);

        assert!(events.emit(EngineEvent::ManifestParsed));
        let signal = rx.try_recv().unwrap();
        assert_eq!(signal.generation, Generation(3));
        assert_eq!(signal.event, EngineEvent::ManifestParsed);

        drop(rx);
        assert!(!events.emit(EngineEvent::fatal(ErrorCategory::Network, "gone")));
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Network.to_string(), "network");
        assert_eq!(ErrorCategory::Other("keySystem".into()).to_string(), "other(keySystem)");
    }
}
