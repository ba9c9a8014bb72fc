//! Player Controller - playback lifecycle orchestrator
//!
//! Coordinates:
//! - Engine binding and fatal error recovery
//! - Serialized play/pause requests
//! - UI state reconciliation from sink events
//! - Controls auto-hide
//!
//! The controller is an actor. User intents arrive through a cloneable
//! [`PlayerHandle`], engine events through the binder's channel and native
//! events through the sink's subscription; a single loop applies them in
//! arrival order. The presentation layer only sees the derived [`UiState`].

use crate::{
    binder::{EngineBinder, Recovery},
    config::PlayerConfig,
    engine::{EngineEvent, EngineFactory, EngineSignal},
    media::{MediaEvent, MediaSink, Viewport},
    reconciler::{UiSignal, UiState},
    serializer::{PlayOutcome, PlaybackSerializer},
    timer::{ControlsTimer, TimerFired},
    types::{Generation, PlaybackPath, SessionId},
    Error, Result,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// User intents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    TogglePlay,
    ToggleMute,
    ToggleFullscreen,
    Refresh,
    Activity,
    Unmount,
}

/// What caused a play request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayTrigger {
    ManifestParsed,
    LoadedMetadata,
    User,
}

/// Results of work spawned off the loop
#[derive(Debug)]
enum Settled {
    Play {
        generation: Generation,
        trigger: PlayTrigger,
        result: Result<PlayOutcome>,
    },
    Pause,
    Fullscreen(Result<()>),
}

/// Cloneable handle to a running controller
#[derive(Clone)]
pub struct PlayerHandle {
    id: SessionId,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<UiState>,
}

impl PlayerHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current UI state
    pub fn state(&self) -> UiState {
        *self.state.borrow()
    }

    /// Subscribe to UI state changes
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    pub fn toggle_play(&self) -> Result<()> {
        self.send(Command::TogglePlay)
    }

    pub fn toggle_mute(&self) -> Result<()> {
        self.send(Command::ToggleMute)
    }

    pub fn toggle_fullscreen(&self) -> Result<()> {
        self.send(Command::ToggleFullscreen)
    }

    /// Tear the stream down and bind it again
    pub fn refresh(&self) -> Result<()> {
        self.send(Command::Refresh)
    }

    /// Pointer move or click anywhere on the player
    pub fn activity(&self) -> Result<()> {
        self.send(Command::Activity)
    }

    /// Stop the controller; the engine is detached and the timer cancelled
    pub fn unmount(&self) -> Result<()> {
        self.send(Command::Unmount)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::ControllerClosed)
    }
}

/// Receivers drained by the run loop
struct Mailboxes {
    commands: mpsc::UnboundedReceiver<Command>,
    engine: mpsc::UnboundedReceiver<EngineSignal>,
    timer: mpsc::UnboundedReceiver<TimerFired>,
    settled: mpsc::UnboundedReceiver<Settled>,
}

/// State owned by the run loop
struct ControllerState {
    id: SessionId,
    binder: EngineBinder,
    serializer: Arc<PlaybackSerializer>,
    sink: Arc<dyn MediaSink>,
    viewport: Arc<dyn Viewport>,
    ui: UiState,
    state_tx: watch::Sender<UiState>,
    timer: ControlsTimer,
    settled_tx: mpsc::UnboundedSender<Settled>,
}

/// Playback lifecycle controller for one live stream
pub struct PlayerController {
    state: ControllerState,
    mailboxes: Mailboxes,
}

impl PlayerController {
    /// Build a controller around its capabilities.
    ///
    /// The engine factory is injected here, once; nothing polls for the
    /// engine becoming available later.
    pub fn new(
        config: PlayerConfig,
        sink: Arc<dyn MediaSink>,
        viewport: Arc<dyn Viewport>,
        engines: Arc<dyn EngineFactory>,
    ) -> Result<(Self, PlayerHandle)> {
        config.validate()?;

        let id = SessionId::new();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (engine_tx, engine_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(UiState::default());

        let state = ControllerState {
            id,
            binder: EngineBinder::new(&config, Arc::clone(&sink), engines, engine_tx),
            serializer: Arc::new(PlaybackSerializer::new(Arc::clone(&sink))),
            sink,
            viewport,
            ui: UiState::default(),
            state_tx,
            timer: ControlsTimer::new(config.idle_timeout(), timer_tx),
            settled_tx,
        };
        let mailboxes = Mailboxes {
            commands: commands_rx,
            engine: engine_rx,
            timer: timer_rx,
            settled: settled_rx,
        };
        let handle = PlayerHandle {
            id,
            commands: commands_tx,
            state: state_rx,
        };

        Ok((Self { state, mailboxes }, handle))
    }

    /// Build the controller and run it on the current runtime
    pub fn mount(
        config: PlayerConfig,
        sink: Arc<dyn MediaSink>,
        viewport: Arc<dyn Viewport>,
        engines: Arc<dyn EngineFactory>,
    ) -> Result<(PlayerHandle, JoinHandle<()>)> {
        let (controller, handle) = Self::new(config, sink, viewport, engines)?;
        let task = tokio::spawn(controller.run());
        Ok((handle, task))
    }

    /// Mount, then process events until unmounted or every handle is gone
    pub async fn run(self) {
        let Self {
            mut state,
            mut mailboxes,
        } = self;

        let mut media = state.sink.subscribe();
        let mut fullscreen = state.viewport.fullscreen_changes();
        let mut fullscreen_open = true;

        state.mount();
        let initial = *fullscreen.borrow_and_update();
        state.apply(UiSignal::FullscreenChanged(initial));

        loop {
            tokio::select! {
                command = mailboxes.commands.recv() => match command {
                    Some(Command::Unmount) | None => break,
                    Some(command) => state.on_command(command),
                },
                Some(signal) = mailboxes.engine.recv() => state.on_engine(signal),
                event = media.recv() => match event {
                    Ok(event) => state.on_media(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Media event listener lagged");
                        state.resync_from_sink();
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("Media sink closed its event stream");
                        break;
                    }
                },
                changed = fullscreen.changed(), if fullscreen_open => match changed {
                    Ok(()) => {
                        let active = *fullscreen.borrow_and_update();
                        state.apply(UiSignal::FullscreenChanged(active));
                    }
                    Err(_) => fullscreen_open = false,
                },
                Some(fired) = mailboxes.timer.recv() => {
                    if state.timer.accept(fired) {
                        state.apply(UiSignal::IdleTimeout);
                    }
                },
                Some(settled) = mailboxes.settled.recv() => state.on_settled(settled),
            }
        }

        state.unmount();
    }
}

impl ControllerState {
    #[instrument(skip(self), fields(session_id = %self.id))]
    fn mount(&mut self) {
        info!(url = %self.binder.source_url(), "Mounting player");
        // autoplay is only allowed muted; the sink must agree with the initial UI state
        self.sink.set_muted(self.ui.muted);
        self.rebind();
        self.timer.reset();
    }

    #[instrument(skip(self), fields(session_id = %self.id))]
    fn unmount(&mut self) {
        self.timer.cancel();
        self.binder.unbind();
        info!("Player unmounted");
    }

    fn on_command(&mut self, command: Command) {
        debug!(?command, "User intent");
        match command {
            Command::TogglePlay => self.toggle_play(),
            Command::ToggleMute => {
                self.sink.set_muted(!self.sink.muted());
                self.activity();
            }
            Command::ToggleFullscreen => self.toggle_fullscreen(),
            Command::Refresh => {
                self.rebind();
                self.activity();
            }
            Command::Activity => self.activity(),
            Command::Unmount => {}
        }
    }

    fn on_engine(&mut self, signal: EngineSignal) {
        if !self.binder.is_current(signal.generation) {
            debug!(generation = %signal.generation, "Dropping event from a released engine");
            return;
        }

        match signal.event {
            EngineEvent::ManifestParsed => {
                info!("Manifest parsed");
                self.start_play(PlayTrigger::ManifestParsed);
            }
            EngineEvent::Error {
                fatal,
                category,
                details,
            } => {
                if fatal {
                    warn!(%category, %details, "Fatal engine error");
                }
                match self.binder.handle_error(fatal, &category) {
                    Ok(Recovery::Ignored) => {}
                    Ok(recovery) => info!(?recovery, "Engine recovery issued"),
                    Err(e) => {
                        error!(code = e.error_code(), error = %e, "Engine recovery failed");
                        self.apply(UiSignal::SurfaceControls);
                    }
                }
            }
        }
    }

    fn on_media(&mut self, event: MediaEvent) {
        // volume payloads can be stale; the sink's own flags are authoritative
        let event = match event {
            MediaEvent::VolumeChange { .. } => MediaEvent::VolumeChange {
                muted: self.sink.muted(),
                volume: self.sink.volume(),
            },
            other => other,
        };
        self.apply(UiSignal::Media(event));
        if event == MediaEvent::LoadedMetadata && self.binder.path() == Some(PlaybackPath::Native) {
            self.start_play(PlayTrigger::LoadedMetadata);
        }
    }

    fn on_settled(&mut self, settled: Settled) {
        match settled {
            Settled::Play {
                generation,
                trigger,
                result,
            } => {
                let failed = !matches!(result, Ok(PlayOutcome::Started));
                if failed && self.binder.is_current(generation) {
                    debug!(?trigger, ?result, "Play did not start, surfacing controls");
                    self.apply(UiSignal::SurfaceControls);
                } else if failed {
                    debug!(?trigger, "Discarding play result from a released binding");
                }
                if trigger == PlayTrigger::User {
                    self.activity();
                }
            }
            Settled::Pause => self.activity(),
            Settled::Fullscreen(result) => {
                if let Err(e) = result {
                    error!(error = %e, "Fullscreen toggle failed");
                }
                self.activity();
            }
        }
    }

    fn rebind(&mut self) {
        match self.binder.bind() {
            Ok(path) => debug!(%path, generation = %self.binder.generation(), "Stream bound"),
            Err(e) => {
                error!(code = e.error_code(), error = %e, "Failed to bind stream");
                self.apply(UiSignal::SurfaceControls);
            }
        }
    }

    fn toggle_play(&mut self) {
        if self.sink.paused() {
            self.start_play(PlayTrigger::User);
            return;
        }
        let serializer = Arc::clone(&self.serializer);
        let settled_tx = self.settled_tx.clone();
        tokio::spawn(async move {
            serializer.request_paused().await;
            let _ = settled_tx.send(Settled::Pause);
        });
    }

    fn start_play(&mut self, trigger: PlayTrigger) {
        let generation = self.binder.generation();
        let serializer = Arc::clone(&self.serializer);
        let settled_tx = self.settled_tx.clone();
        tokio::spawn(async move {
            let result = serializer.request_play().await;
            let _ = settled_tx.send(Settled::Play {
                generation,
                trigger,
                result,
            });
        });
    }

    fn toggle_fullscreen(&mut self) {
        let viewport = Arc::clone(&self.viewport);
        let settled_tx = self.settled_tx.clone();
        tokio::spawn(async move {
            let result = if viewport.is_fullscreen() {
                viewport.exit_fullscreen().await
            } else {
                viewport.request_fullscreen().await
            };
            let _ = settled_tx.send(Settled::Fullscreen(result.map_err(Error::Fullscreen)));
        });
    }

    fn activity(&mut self) {
        self.apply(UiSignal::Activity);
        self.timer.reset();
    }

    /// Rebuild sink-derived flags after missing events
    fn resync_from_sink(&mut self) {
        self.apply(UiSignal::SinkResync {
            playing: !self.sink.paused(),
            muted: self.sink.muted(),
            volume: self.sink.volume(),
        });
    }

    fn apply(&mut self, signal: UiSignal) {
        if self.ui.apply(&signal) {
            debug!(?signal, state = ?self.ui, "UI state changed");
            self.state_tx.send_replace(self.ui);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedEngineFactory, SimulatedSink, SimulatedViewport};

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = PlayerConfig::default();
        config.idle_timeout_ms = 0;

        let result = PlayerController::new(
            config,
            Arc::new(SimulatedSink::new()),
            Arc::new(SimulatedViewport::new()),
            Arc::new(SimulatedEngineFactory::new()),
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_handle_reports_closed_after_unmount() {
        let (handle, task) = PlayerController::mount(
            PlayerConfig::default(),
            Arc::new(SimulatedSink::new()),
            Arc::new(SimulatedViewport::new()),
            Arc::new(SimulatedEngineFactory::new()),
        )
        .unwrap();

        assert_eq!(handle.state(), UiState::default());
        handle.unmount().unwrap();
        task.await.unwrap();

        assert!(!handle.is_running());
        assert_eq!(handle.toggle_play(), Err(Error::ControllerClosed));
    }
}
