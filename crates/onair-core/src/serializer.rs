//! Playback Serializer - one play request in flight at a time
//!
//! A pending `play()` is held as a [`PlayToken`] (a shared future). Any new
//! play or pause first drains the outstanding token, discarding its
//! outcome, so the sink never sees a mutating call while a play is still
//! resolving.

use crate::{error::PlayRejection, media::MediaSink, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, instrument};

type PlayFuture = Shared<BoxFuture<'static, std::result::Result<(), PlayRejection>>>;

/// Handle to one in-flight `play()` call
#[derive(Clone)]
pub struct PlayToken {
    id: u64,
    settled: PlayFuture,
}

impl PlayToken {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Debug for PlayToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayToken").field("id", &self.id).finish()
    }
}

/// Result of a play request that did not genuinely fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The sink accepted the request
    Started,
    /// Refused for an expected reason (autoplay policy, superseded)
    Suppressed(PlayRejection),
}

impl PlayOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, PlayOutcome::Started)
    }
}

/// Serializes play/pause against one media sink
pub struct PlaybackSerializer {
    sink: Arc<dyn MediaSink>,
    pending: Mutex<Option<PlayToken>>,
    next_id: AtomicU64,
}

impl PlaybackSerializer {
    pub fn new(sink: Arc<dyn MediaSink>) -> Self {
        Self {
            sink,
            pending: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// True while a play request is unresolved
    pub fn has_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// Issue `play()` once every earlier play has settled.
    ///
    /// Benign rejections come back as [`PlayOutcome::Suppressed`]; anything
    /// else is a genuine failure and is returned as an error.
    #[instrument(skip(self))]
    pub async fn request_play(&self) -> Result<PlayOutcome> {
        let token = loop {
            let waiting = {
                let mut pending = self.lock();
                match pending.as_ref() {
                    Some(token) => token.clone(),
                    None => {
                        let token = self.issue();
                        *pending = Some(token.clone());
                        break token;
                    }
                }
            };
            debug!(token = waiting.id, "Draining outstanding play request");
            let _ = waiting.settled.clone().await;
            self.settle(waiting.id);
        };

        let result = token.settled.clone().await;
        self.settle(token.id);

        match result {
            Ok(()) => Ok(PlayOutcome::Started),
            Err(rejection) if rejection.is_benign() => {
                debug!(token = token.id, reason = %rejection, "Play request suppressed");
                Ok(PlayOutcome::Suppressed(rejection))
            }
            Err(rejection) => {
                error!(token = token.id, reason = %rejection, "Playback failed");
                Err(rejection.into())
            }
        }
    }

    /// Pause once any outstanding play has settled, whatever its outcome
    #[instrument(skip(self))]
    pub async fn request_paused(&self) {
        loop {
            let waiting = {
                let pending = self.lock();
                match pending.as_ref() {
                    Some(token) => token.clone(),
                    None => {
                        self.sink.pause();
                        return;
                    }
                }
            };
            debug!(token = waiting.id, "Pause waiting for play request");
            let _ = waiting.settled.clone().await;
            self.settle(waiting.id);
        }
    }

    fn issue(&self) -> PlayToken {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let sink = Arc::clone(&self.sink);
        let settled = async move { sink.play().await }.boxed().shared();
        debug!(token = id, "Issuing play request");
        PlayToken { id, settled }
    }

    /// Clear the slot if it still holds token `id`
    fn settle(&self, id: u64) {
        let mut pending = self.lock();
        if pending.as_ref().map(|t| t.id) == Some(id) {
            *pending = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<PlayToken>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedSink, SinkCall};
    use crate::Error;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn serializer(sink: &Arc<SimulatedSink>) -> Arc<PlaybackSerializer> {
        Arc::new(PlaybackSerializer::new(sink.clone()))
    }

    #[tokio::test]
    async fn test_play_started() {
        let sink = Arc::new(SimulatedSink::new());
        let serializer = serializer(&sink);

        let outcome = assert_ok!(serializer.request_play().await);
        assert!(outcome.is_started());
        assert!(!serializer.has_pending());
        assert!(!sink.paused());
    }

    #[tokio::test]
    async fn test_benign_rejections_are_suppressed() {
        let sink = Arc::new(SimulatedSink::new());
        sink.push_play_outcome(Err(PlayRejection::NotAllowed));
        sink.push_play_outcome(Err(PlayRejection::Aborted));
        let serializer = serializer(&sink);

        assert_eq!(
            serializer.request_play().await,
            Ok(PlayOutcome::Suppressed(PlayRejection::NotAllowed))
        );
        assert_eq!(
            serializer.request_play().await,
            Ok(PlayOutcome::Suppressed(PlayRejection::Aborted))
        );
        assert!(!serializer.has_pending());
    }

    #[tokio::test]
    async fn test_genuine_failure_propagates() {
        let sink = Arc::new(SimulatedSink::new());
        sink.push_play_outcome(Err(PlayRejection::Failed("decode error".into())));
        let serializer = serializer(&sink);

        let err = assert_err!(serializer.request_play().await);
        assert!(matches!(err, Error::Playback(_)));
        assert!(!serializer.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_waits_for_pending_play() {
        let sink = Arc::new(SimulatedSink::new().with_play_delay(Duration::from_millis(200)));
        let serializer = serializer(&sink);

        let play = {
            let serializer = Arc::clone(&serializer);
            tokio::spawn(async move { serializer.request_play().await })
        };
        tokio::task::yield_now().await;
        assert!(serializer.has_pending());

        serializer.request_paused().await;
        assert_ok!(play.await.unwrap());

        assert_eq!(sink.calls(), vec![SinkCall::Play, SinkCall::Pause]);
        assert_eq!(sink.overlapping_calls(), 0);
        assert!(sink.paused());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interleaved_requests_never_overlap() {
        let sink = Arc::new(SimulatedSink::new().with_play_delay(Duration::from_millis(75)));
        sink.push_play_outcome(Err(PlayRejection::Aborted));
        sink.push_play_outcome(Ok(()));
        sink.push_play_outcome(Err(PlayRejection::Failed("glitch".into())));
        let serializer = serializer(&sink);

        let mut tasks = Vec::new();
        for i in 0..8 {
            let serializer = Arc::clone(&serializer);
            tasks.push(tokio::spawn(async move {
                if i % 3 == 2 {
                    serializer.request_paused().await;
                } else {
                    let _ = serializer.request_play().await;
                }
            }));
            tokio::task::yield_now().await;
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(sink.overlapping_calls(), 0);
        assert_eq!(sink.play_calls(), 6);
        assert_eq!(sink.pause_calls(), 2);
        assert!(!serializer.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_token_does_not_block_next_play() {
        let sink = Arc::new(SimulatedSink::new().with_play_delay(Duration::from_millis(10)));
        sink.push_play_outcome(Err(PlayRejection::Failed("first".into())));
        let serializer = serializer(&sink);

        let first = {
            let serializer = Arc::clone(&serializer);
            tokio::spawn(async move { serializer.request_play().await })
        };
        tokio::task::yield_now().await;

        let second = serializer.request_play().await;
        assert!(first.await.unwrap().is_err());
        assert_eq!(second, Ok(PlayOutcome::Started));
        assert_eq!(sink.play_calls(), 2);
    }
}
