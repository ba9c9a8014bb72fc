//! Error types for OnAir Core

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Controller error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Playback errors
    #[error("Playback failed: {0}")]
    Playback(String),

    // Engine errors
    #[error("Stream format is not playable natively or through the streaming engine")]
    EngineUnsupported,

    #[error("Streaming engine error: {0}")]
    Engine(String),

    // Viewport errors
    #[error("Fullscreen request failed: {0}")]
    Fullscreen(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Lifecycle errors
    #[error("Player controller is no longer running")]
    ControllerClosed,

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if the controller can keep going after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Playback(_) | Error::Engine(_) | Error::Fullscreen(_)
        )
    }

    /// Returns the error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Playback(_) => "PLAYBACK_FAILED",
            Error::EngineUnsupported => "ENGINE_UNSUPPORTED",
            Error::Engine(_) => "ENGINE",
            Error::Fullscreen(_) => "FULLSCREEN",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::ControllerClosed => "CONTROLLER_CLOSED",
            Error::Internal(_) => "INTERNAL",
        }
    }
}

/// Why a media sink refused a `play()` request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayRejection {
    /// The request was superseded by a newer load or pause
    #[error("play request was aborted")]
    Aborted,

    /// Autoplay policy requires a user gesture
    #[error("play request was not allowed without a user gesture")]
    NotAllowed,

    /// Anything else the sink reports
    #[error("play request failed: {0}")]
    Failed(String),
}

impl PlayRejection {
    /// Classify a DOM-style exception name
    pub fn from_name(name: &str, message: impl Into<String>) -> Self {
        match name {
            "AbortError" => PlayRejection::Aborted,
            "NotAllowedError" => PlayRejection::NotAllowed,
            _ => PlayRejection::Failed(message.into()),
        }
    }

    /// Expected outcomes that must not be reported as failures
    pub fn is_benign(&self) -> bool {
        matches!(self, PlayRejection::Aborted | PlayRejection::NotAllowed)
    }
}

impl From<PlayRejection> for Error {
    fn from(rejection: PlayRejection) -> Self {
        Error::Playback(rejection.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classification() {
        assert_eq!(PlayRejection::from_name("AbortError", "x"), PlayRejection::Aborted);
        assert_eq!(PlayRejection::from_name("NotAllowedError", "x"), PlayRejection::NotAllowed);
        assert_eq!(
            PlayRejection::from_name("NotSupportedError", "no source"),
            PlayRejection::Failed("no source".into())
        );
    }

    #[test]
    fn test_benign_rejections() {
        assert!(PlayRejection::Aborted.is_benign());
        assert!(PlayRejection::NotAllowed.is_benign());
        assert!(!PlayRejection::Failed("decode".into()).is_benign());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::EngineUnsupported.error_code(), "ENGINE_UNSUPPORTED");
        assert_eq!(
            Error::from(PlayRejection::Failed("boom".into())).error_code(),
            "PLAYBACK_FAILED"
        );
        assert!(Error::Engine("load".into()).is_recoverable());
        assert!(!Error::ControllerClosed.is_recoverable());
    }
}
