//! UI State Reconciler
//!
//! [`UiState`] is a pure fold over [`UiSignal`]s: two controllers that saw
//! the same signals in the same order hold the same state.

use crate::media::MediaEvent;
use serde::{Deserialize, Serialize};

/// Everything the presentation layer renders from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UiState {
    pub playing: bool,
    pub muted: bool,
    pub buffering: bool,
    pub controls_visible: bool,
    pub fullscreen: bool,
}

impl Default for UiState {
    /// Autoplay policies only allow muted starts, so a fresh player is
    /// muted, buffering and showing its controls.
    fn default() -> Self {
        Self {
            playing: false,
            muted: true,
            buffering: true,
            controls_visible: true,
            fullscreen: false,
        }
    }
}

/// Inputs that move the UI state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiSignal {
    /// Native sink event
    Media(MediaEvent),
    /// Document-level fullscreen change (ground truth)
    FullscreenChanged(bool),
    /// Pointer move, click or any intent
    Activity,
    /// Controls timer expired
    IdleTimeout,
    /// A play attempt failed; let the user start playback by hand
    SurfaceControls,
    /// Flags read back from the sink after events were missed.
    /// Buffering is not observable this way and is left alone.
    SinkResync { playing: bool, muted: bool, volume: f64 },
}

impl UiState {
    /// Apply one signal; returns true if anything changed
    pub fn apply(&mut self, signal: &UiSignal) -> bool {
        let before = *self;
        match *signal {
            UiSignal::Media(MediaEvent::Play) => {
                self.playing = true;
                self.buffering = false;
            }
            UiSignal::Media(MediaEvent::Pause) => self.playing = false,
            UiSignal::Media(MediaEvent::Waiting) => self.buffering = true,
            UiSignal::Media(MediaEvent::Playing) => self.buffering = false,
            UiSignal::Media(MediaEvent::VolumeChange { muted, volume }) => {
                self.muted = muted || volume == 0.0;
            }
            UiSignal::SinkResync {
                playing,
                muted,
                volume,
            } => {
                self.playing = playing;
                self.muted = muted || volume == 0.0;
            }
            UiSignal::Media(MediaEvent::LoadedMetadata) => {}
            UiSignal::FullscreenChanged(active) => self.fullscreen = active,
            UiSignal::Activity | UiSignal::SurfaceControls => self.controls_visible = true,
            UiSignal::IdleTimeout => self.controls_visible = false,
        }
        *self != before
    }

    /// Fold a signal history starting from the initial state
    pub fn replay<'a>(signals: impl IntoIterator<Item = &'a UiSignal>) -> Self {
        let mut state = Self::default();
        for signal in signals {
            state.apply(signal);
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = UiState::default();
        assert!(state.buffering);
        assert!(state.muted);
        assert!(!state.playing);
        assert!(state.controls_visible);
        assert!(!state.fullscreen);
    }

    #[test]
    fn test_playback_events() {
        let mut state = UiState::default();

        assert!(state.apply(&UiSignal::Media(MediaEvent::Play)));
        assert!(state.playing);
        assert!(!state.buffering);

        assert!(state.apply(&UiSignal::Media(MediaEvent::Waiting)));
        assert!(state.buffering);
        assert!(state.playing);

        assert!(state.apply(&UiSignal::Media(MediaEvent::Playing)));
        assert!(!state.buffering);

        assert!(state.apply(&UiSignal::Media(MediaEvent::Pause)));
        assert!(!state.playing);
        assert!(!state.apply(&UiSignal::Media(MediaEvent::Pause)));
    }

    #[test]
    fn test_volume_change() {
        let mut state = UiState::default();

        state.apply(&UiSignal::Media(MediaEvent::VolumeChange { muted: false, volume: 0.8 }));
        assert!(!state.muted);

        // zero volume reads as muted even with the flag off
        state.apply(&UiSignal::Media(MediaEvent::VolumeChange { muted: false, volume: 0.0 }));
        assert!(state.muted);

        state.apply(&UiSignal::Media(MediaEvent::VolumeChange { muted: true, volume: 1.0 }));
        assert!(state.muted);
    }

    #[test]
    fn test_sink_resync_keeps_buffering() {
        let mut state = UiState::default();
        state.apply(&UiSignal::Media(MediaEvent::Play));
        state.apply(&UiSignal::Media(MediaEvent::Waiting));

        assert!(!state.apply(&UiSignal::SinkResync {
            playing: true,
            muted: true,
            volume: 1.0,
        }));
        assert!(state.buffering);

        state.apply(&UiSignal::SinkResync {
            playing: false,
            muted: false,
            volume: 0.0,
        });
        assert!(!state.playing);
        assert!(state.muted);
        assert!(state.buffering);
    }

    #[test]
    fn test_controls_visibility() {
        let mut state = UiState::default();

        assert!(state.apply(&UiSignal::IdleTimeout));
        assert!(!state.controls_visible);
        assert!(!state.apply(&UiSignal::IdleTimeout));

        assert!(state.apply(&UiSignal::SurfaceControls));
        assert!(state.controls_visible);
        assert!(!state.apply(&UiSignal::Activity));
    }

    #[test]
    fn test_fullscreen_follows_signal() {
        let mut state = UiState::default();
        assert!(state.apply(&UiSignal::FullscreenChanged(true)));
        assert!(state.fullscreen);
        assert!(state.apply(&UiSignal::FullscreenChanged(false)));
        assert!(!state.fullscreen);
    }

    #[test]
    fn test_metadata_changes_nothing() {
        let mut state = UiState::default();
        assert!(!state.apply(&UiSignal::Media(MediaEvent::LoadedMetadata)));
    }

    #[test]
    fn test_same_history_same_state() {
        let history = [
            UiSignal::Media(MediaEvent::Play),
            UiSignal::Media(MediaEvent::VolumeChange { muted: false, volume: 0.5 }),
            UiSignal::IdleTimeout,
            UiSignal::FullscreenChanged(true),
            UiSignal::Media(MediaEvent::Waiting),
        ];

        let a = UiState::replay(&history);
        let b = UiState::replay(history.iter());
        assert_eq!(a, b);
        assert_eq!(
            a,
            UiState {
                playing: true,
                muted: false,
                buffering: true,
                controls_visible: false,
                fullscreen: true,
            }
        );
    }
}
