//! Simulated capabilities
//!
//! In-process stand-ins for the streaming engine, the media sink and the
//! fullscreen viewport. They record every call they receive, so they back
//! both the headless CLI runner and the test suite.

use crate::{
    config::EngineConfig,
    engine::{EngineEvent, EngineEvents, EngineFactory, StreamingEngine},
    error::PlayRejection,
    media::{MediaEvent, MediaSink, Viewport},
    Result,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::debug;
use url::Url;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Engine
// =============================================================================

/// A call received by a simulated engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Construct { instance: usize, config: EngineConfig },
    LoadSource { instance: usize, url: Url },
    AttachMedia { instance: usize },
    ResumeLoad { instance: usize },
    RecoverMediaError { instance: usize },
    Destroy { instance: usize },
}

#[derive(Default)]
struct EngineLedger {
    calls: Mutex<Vec<EngineCall>>,
    emitters: Mutex<Vec<EngineEvents>>,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

impl EngineLedger {
    fn record(&self, call: EngineCall) {
        debug!(?call, "Simulated engine call");
        lock(&self.calls).push(call);
    }
}

/// Factory producing [`SimulatedEngine`]s
pub struct SimulatedEngineFactory {
    ledger: Arc<EngineLedger>,
    supported: bool,
    auto_manifest: bool,
}

impl Default for SimulatedEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEngineFactory {
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(EngineLedger::default()),
            supported: true,
            auto_manifest: false,
        }
    }

    /// Factory for an environment where the engine cannot run
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    /// Engines report `ManifestParsed` as soon as they are attached
    pub fn with_auto_manifest(mut self) -> Self {
        self.auto_manifest = true;
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.ledger.calls).clone()
    }

    pub fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        lock(&self.ledger.calls).iter().filter(|c| predicate(c)).count()
    }

    pub fn constructed(&self) -> usize {
        lock(&self.ledger.emitters).len()
    }

    /// Engines constructed and not yet destroyed
    pub fn live_engines(&self) -> usize {
        self.ledger.live.load(Ordering::SeqCst)
    }

    /// Highest number of engines ever alive at the same time
    pub fn max_live_engines(&self) -> usize {
        self.ledger.max_live.load(Ordering::SeqCst)
    }

    /// Emit an event from a specific engine instance
    pub fn emit_from(&self, instance: usize, event: EngineEvent) -> bool {
        let emitter = lock(&self.ledger.emitters).get(instance).cloned();
        emitter.map(|e| e.emit(event)).unwrap_or(false)
    }

    /// Emit an event from the most recently constructed engine
    pub fn emit(&self, event: EngineEvent) -> bool {
        let emitter = lock(&self.ledger.emitters).last().cloned();
        emitter.map(|e| e.emit(event)).unwrap_or(false)
    }
}

impl EngineFactory for SimulatedEngineFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn construct(&self, config: &EngineConfig, events: EngineEvents) -> Result<Box<dyn StreamingEngine>> {
        let instance = {
            let mut emitters = lock(&self.ledger.emitters);
            emitters.push(events.clone());
            emitters.len() - 1
        };
        self.ledger.record(EngineCall::Construct {
            instance,
            config: config.clone(),
        });
        let live = self.ledger.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.ledger.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(SimulatedEngine {
            instance,
            ledger: Arc::clone(&self.ledger),
            events,
            auto_manifest: self.auto_manifest,
            destroyed: false,
        }))
    }
}

/// Engine that records calls instead of streaming
pub struct SimulatedEngine {
    instance: usize,
    ledger: Arc<EngineLedger>,
    events: EngineEvents,
    auto_manifest: bool,
    destroyed: bool,
}

impl StreamingEngine for SimulatedEngine {
    fn load_source(&mut self, url: &Url) -> Result<()> {
        self.ledger.record(EngineCall::LoadSource {
            instance: self.instance,
            url: url.clone(),
        });
        Ok(())
    }

    fn attach_media(&mut self, _sink: Arc<dyn MediaSink>) -> Result<()> {
        self.ledger.record(EngineCall::AttachMedia {
            instance: self.instance,
        });
        if self.auto_manifest {
            self.events.emit(EngineEvent::ManifestParsed);
        }
        Ok(())
    }

    fn resume_load(&mut self) {
        self.ledger.record(EngineCall::ResumeLoad {
            instance: self.instance,
        });
    }

    fn recover_media_error(&mut self) {
        self.ledger.record(EngineCall::RecoverMediaError {
            instance: self.instance,
        });
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.ledger.record(EngineCall::Destroy {
            instance: self.instance,
        });
        self.ledger.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Media sink
// =============================================================================

/// A mutating call received by a simulated sink
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Play,
    Pause,
    SetMuted(bool),
    SetSource(Url),
}

struct SinkState {
    paused: bool,
    muted: bool,
    volume: f64,
    source: Option<Url>,
    play_delay: Duration,
    outcomes: VecDeque<std::result::Result<(), PlayRejection>>,
    calls: Vec<SinkCall>,
}

/// Media sink that resolves `play()` from a scripted outcome queue
pub struct SimulatedSink {
    state: Mutex<SinkState>,
    events: broadcast::Sender<MediaEvent>,
    native: bool,
    in_flight: AtomicUsize,
    overlaps: AtomicUsize,
}

impl Default for SimulatedSink {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SimulatedSink {
    /// Sink without native support for the stream format
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(SinkState {
                paused: true,
                muted: true,
                volume: 1.0,
                source: None,
                play_delay: Duration::ZERO,
                outcomes: VecDeque::new(),
                calls: Vec::new(),
            }),
            events,
            native: false,
            in_flight: AtomicUsize::new(0),
            overlaps: AtomicUsize::new(0),
        }
    }

    /// Sink that plays the stream format natively
    pub fn native() -> Self {
        Self {
            native: true,
            ..Self::new()
        }
    }

    /// Time each `play()` takes to settle
    pub fn with_play_delay(self, delay: Duration) -> Self {
        lock(&self.state).play_delay = delay;
        self
    }

    /// Queue the result of a future `play()`; unqueued calls succeed
    pub fn push_play_outcome(&self, outcome: std::result::Result<(), PlayRejection>) {
        lock(&self.state).outcomes.push_back(outcome);
    }

    /// Push a native event as if the element fired it
    pub fn emit(&self, event: MediaEvent) {
        let _ = self.events.send(event);
    }

    /// Change the volume as if the user used a hardware control
    pub fn set_volume(&self, volume: f64) {
        let muted = {
            let mut state = lock(&self.state);
            state.volume = volume;
            state.muted
        };
        self.emit(MediaEvent::VolumeChange { muted, volume });
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        lock(&self.state).calls.clone()
    }

    pub fn play_calls(&self) -> usize {
        lock(&self.state).calls.iter().filter(|c| **c == SinkCall::Play).count()
    }

    pub fn pause_calls(&self) -> usize {
        lock(&self.state).calls.iter().filter(|c| **c == SinkCall::Pause).count()
    }

    /// Mutating calls that arrived while a `play()` was still unresolved
    pub fn overlapping_calls(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn source(&self) -> Option<Url> {
        lock(&self.state).source.clone()
    }

    fn enter_mutation(&self, call: SinkCall) {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        lock(&self.state).calls.push(call);
    }
}

#[async_trait]
impl MediaSink for SimulatedSink {
    async fn play(&self) -> std::result::Result<(), PlayRejection> {
        self.enter_mutation(SinkCall::Play);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let delay = lock(&self.state).play_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let (outcome, started) = {
            let mut state = lock(&self.state);
            let outcome = state.outcomes.pop_front().unwrap_or(Ok(()));
            let started = outcome.is_ok() && state.paused;
            if started {
                state.paused = false;
            }
            (outcome, started)
        };
        if started {
            self.emit(MediaEvent::Play);
            self.emit(MediaEvent::Playing);
        }
        outcome
    }

    fn pause(&self) {
        self.enter_mutation(SinkCall::Pause);
        let was_playing = {
            let mut state = lock(&self.state);
            let was_playing = !state.paused;
            state.paused = true;
            was_playing
        };
        if was_playing {
            self.emit(MediaEvent::Pause);
        }
    }

    fn paused(&self) -> bool {
        lock(&self.state).paused
    }

    fn muted(&self) -> bool {
        lock(&self.state).muted
    }

    fn set_muted(&self, muted: bool) {
        let volume = {
            let mut state = lock(&self.state);
            state.muted = muted;
            state.calls.push(SinkCall::SetMuted(muted));
            state.volume
        };
        self.emit(MediaEvent::VolumeChange { muted, volume });
    }

    fn volume(&self) -> f64 {
        lock(&self.state).volume
    }

    fn can_play_type(&self, _mime_type: &str) -> bool {
        self.native
    }

    fn set_source(&self, url: &Url) {
        {
            let mut state = lock(&self.state);
            state.source = Some(url.clone());
            state.calls.push(SinkCall::SetSource(url.clone()));
        }
        self.emit(MediaEvent::LoadedMetadata);
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events.subscribe()
    }
}

// =============================================================================
// Viewport
// =============================================================================

/// Viewport whose fullscreen requests succeed unless told otherwise
pub struct SimulatedViewport {
    fullscreen: watch::Sender<bool>,
    rejection: Mutex<Option<String>>,
    requests: AtomicUsize,
}

impl Default for SimulatedViewport {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedViewport {
    pub fn new() -> Self {
        let (fullscreen, _) = watch::channel(false);
        Self {
            fullscreen,
            rejection: Mutex::new(None),
            requests: AtomicUsize::new(0),
        }
    }

    /// Make every following request/exit fail with `reason`
    pub fn reject_with(&self, reason: impl Into<String>) {
        *lock(&self.rejection) = Some(reason.into());
    }

    /// Flip fullscreen from outside the controller (e.g. the Escape key)
    pub fn set_fullscreen(&self, active: bool) {
        self.fullscreen.send_replace(active);
    }

    /// Requests and exits received
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn transition(&self, active: bool) -> std::result::Result<(), String> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = lock(&self.rejection).clone() {
            return Err(reason);
        }
        self.fullscreen.send_replace(active);
        Ok(())
    }
}

#[async_trait]
impl Viewport for SimulatedViewport {
    async fn request_fullscreen(&self) -> std::result::Result<(), String> {
        self.transition(true)
    }

    async fn exit_fullscreen(&self) -> std::result::Result<(), String> {
        self.transition(false)
    }

    fn is_fullscreen(&self) -> bool {
        *self.fullscreen.borrow()
    }

    fn fullscreen_changes(&self) -> watch::Receiver<bool> {
        self.fullscreen.subscribe()
    }
}
