//! Engine Binder - owns the single streaming engine attached to the sink
//!
//! Every bind tears the previous engine down before a new one is built, so
//! the sink never has two engines attached. Each binding gets a fresh
//! [`Generation`]; events and late results tagged with an older generation
//! are stale.

use crate::{
    config::{EngineConfig, PlayerConfig},
    engine::{EngineEvents, EngineFactory, EngineSignal, ErrorCategory, StreamingEngine},
    media::MediaSink,
    types::{Generation, PlaybackPath},
    Error, Result,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// What the binder did about an engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Non-fatal; the engine heals itself
    Ignored,
    /// Loading restarted on the same engine
    ResumedLoad,
    /// Media error recovery ran on the same engine
    RecoveredMedia,
    /// Engine destroyed and rebuilt from a fresh manifest load
    Rebound(PlaybackPath),
}

/// Binds the stream source to the media sink
pub struct EngineBinder {
    source_url: Url,
    engine_config: EngineConfig,
    native_mime_type: String,
    sink: Arc<dyn MediaSink>,
    factory: Arc<dyn EngineFactory>,
    events_tx: mpsc::UnboundedSender<EngineSignal>,
    /// Live engine handle; never leaves this struct
    engine: Option<Box<dyn StreamingEngine>>,
    path: Option<PlaybackPath>,
    generation: Generation,
}

impl EngineBinder {
    pub fn new(
        config: &PlayerConfig,
        sink: Arc<dyn MediaSink>,
        factory: Arc<dyn EngineFactory>,
        events_tx: mpsc::UnboundedSender<EngineSignal>,
    ) -> Self {
        Self {
            source_url: config.source_url.clone(),
            engine_config: config.engine.clone(),
            native_mime_type: config.native_mime_type.clone(),
            sink,
            factory,
            events_tx,
            engine: None,
            path: None,
            generation: Generation::default(),
        }
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn path(&self) -> Option<PlaybackPath> {
        self.path
    }

    pub fn is_bound(&self) -> bool {
        self.path.is_some()
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// True if `generation` names the binding that is live right now
    pub fn is_current(&self, generation: Generation) -> bool {
        self.is_bound() && generation == self.generation
    }

    /// Bind (or re-bind) the source to the sink.
    ///
    /// Safe to call repeatedly: the previous binding is always released
    /// before anything new is created.
    #[instrument(skip(self), fields(url = %self.source_url))]
    pub fn bind(&mut self) -> Result<PlaybackPath> {
        self.unbind();
        self.generation = self.generation.next();

        if self.sink.can_play_type(&self.native_mime_type) {
            self.sink.set_source(&self.source_url);
            self.path = Some(PlaybackPath::Native);
            info!(generation = %self.generation, "Bound stream to native playback");
            return Ok(PlaybackPath::Native);
        }

        if !self.factory.is_supported() {
            warn!("Neither native playback nor the streaming engine is available");
            return Err(Error::EngineUnsupported);
        }

        let events = EngineEvents::new(self.generation, self.events_tx.clone());
        let mut engine = self.factory.construct(&self.engine_config, events)?;

        let attached = engine
            .load_source(&self.source_url)
            .and_then(|_| engine.attach_media(Arc::clone(&self.sink)));
        if let Err(e) = attached {
            engine.destroy();
            return Err(e);
        }

        self.engine = Some(engine);
        self.path = Some(PlaybackPath::Engine);
        info!(
            generation = %self.generation,
            low_latency = self.engine_config.low_latency,
            worker = self.engine_config.worker_decoding,
            "Bound stream to streaming engine"
        );
        Ok(PlaybackPath::Engine)
    }

    /// Release the current binding, destroying the engine if there is one
    pub fn unbind(&mut self) {
        if !self.is_bound() && self.engine.is_none() {
            return;
        }
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
            debug!(generation = %self.generation, "Destroyed streaming engine");
        }
        self.path = None;
        self.generation = self.generation.next();
    }

    /// Act on an engine error from the current binding
    #[instrument(skip(self))]
    pub fn handle_error(&mut self, fatal: bool, category: &ErrorCategory) -> Result<Recovery> {
        if !fatal {
            debug!(%category, "Ignoring non-fatal engine error");
            return Ok(Recovery::Ignored);
        }

        match (category, self.engine.as_mut()) {
            (ErrorCategory::Network, Some(engine)) => {
                warn!("Fatal network error, resuming load");
                engine.resume_load();
                Ok(Recovery::ResumedLoad)
            }
            (ErrorCategory::Media, Some(engine)) => {
                warn!("Fatal media error, recovering");
                engine.recover_media_error();
                Ok(Recovery::RecoveredMedia)
            }
            _ => {
                warn!(%category, "Unrecoverable engine error, rebinding");
                self.bind().map(Recovery::Rebound)
            }
        }
    }
}

impl Drop for EngineBinder {
    fn drop(&mut self) {
        self.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{EngineCall, SimulatedEngineFactory, SimulatedSink};

    fn binder(sink: Arc<SimulatedSink>, factory: Arc<SimulatedEngineFactory>) -> EngineBinder {
        let (tx, _rx) = mpsc::unbounded_channel();
        EngineBinder::new(&PlayerConfig::default(), sink, factory, tx)
    }

    #[test]
    fn test_bind_constructs_configured_engine() {
        let factory = Arc::new(SimulatedEngineFactory::new());
        let mut binder = binder(Arc::new(SimulatedSink::new()), factory.clone());

        assert_eq!(binder.bind().unwrap(), PlaybackPath::Engine);
        assert!(binder.has_engine());
        assert_eq!(factory.live_engines(), 1);

        let calls = factory.calls();
        match &calls[0] {
            EngineCall::Construct { config, .. } => {
                assert!(config.low_latency);
                assert!(config.worker_decoding);
                assert_eq!(config.manifest_retry.attempts(), None);
                assert_eq!(config.level_retry.attempts(), None);
            }
            other => panic!("expected construct, got {other:?}"),
        }
        assert!(matches!(&calls[1], EngineCall::LoadSource { url, .. } if url == binder.source_url()));
        assert!(matches!(calls[2], EngineCall::AttachMedia { .. }));
    }

    #[test]
    fn test_native_playback_skips_engine() {
        let sink = Arc::new(SimulatedSink::native());
        let factory = Arc::new(SimulatedEngineFactory::new());
        let mut binder = binder(sink.clone(), factory.clone());

        assert_eq!(binder.bind().unwrap(), PlaybackPath::Native);
        assert!(!binder.has_engine());
        assert_eq!(factory.constructed(), 0);
        assert_eq!(sink.source().as_ref(), Some(binder.source_url()));
    }

    #[test]
    fn test_unsupported_environment() {
        let factory = Arc::new(SimulatedEngineFactory::unsupported());
        let mut binder = binder(Arc::new(SimulatedSink::new()), factory);

        assert_eq!(binder.bind(), Err(Error::EngineUnsupported));
        assert!(!binder.is_bound());
    }

    #[test]
    fn test_rebind_destroys_before_create() {
        let factory = Arc::new(SimulatedEngineFactory::new());
        let mut binder = binder(Arc::new(SimulatedSink::new()), factory.clone());

        binder.bind().unwrap();
        let first = binder.generation();
        binder.bind().unwrap();
        binder.bind().unwrap();

        assert_eq!(factory.constructed(), 3);
        assert_eq!(factory.live_engines(), 1);
        assert_eq!(factory.max_live_engines(), 1);
        assert!(!binder.is_current(first));
        assert!(binder.is_current(binder.generation()));
    }

    #[test]
    fn test_fatal_error_dispatch() {
        let factory = Arc::new(SimulatedEngineFactory::new());
        let mut binder = binder(Arc::new(SimulatedSink::new()), factory.clone());
        binder.bind().unwrap();

        assert_eq!(
            binder.handle_error(true, &ErrorCategory::Network).unwrap(),
            Recovery::ResumedLoad
        );
        assert_eq!(
            binder.handle_error(true, &ErrorCategory::Media).unwrap(),
            Recovery::RecoveredMedia
        );
        assert_eq!(factory.constructed(), 1);
        assert_eq!(factory.count(|c| matches!(c, EngineCall::Destroy { .. })), 0);

        assert_eq!(
            binder.handle_error(true, &ErrorCategory::Other("mux".into())).unwrap(),
            Recovery::Rebound(PlaybackPath::Engine)
        );
        assert_eq!(factory.constructed(), 2);
        assert_eq!(factory.live_engines(), 1);
        assert_eq!(
            factory.count(|c| matches!(c, EngineCall::Destroy { instance: 0 })),
            1
        );
    }

    #[test]
    fn test_non_fatal_error_ignored() {
        let factory = Arc::new(SimulatedEngineFactory::new());
        let mut binder = binder(Arc::new(SimulatedSink::new()), factory.clone());
        binder.bind().unwrap();

        assert_eq!(
            binder.handle_error(false, &ErrorCategory::Other("buffer".into())).unwrap(),
            Recovery::Ignored
        );
        assert_eq!(factory.constructed(), 1);
        assert_eq!(factory.calls().len(), 3);
    }

    #[test]
    fn test_drop_releases_engine() {
        let factory = Arc::new(SimulatedEngineFactory::new());
        {
            let mut binder = binder(Arc::new(SimulatedSink::new()), factory.clone());
            binder.bind().unwrap();
            assert_eq!(factory.live_engines(), 1);
        }
        assert_eq!(factory.live_engines(), 0);
    }
}
