//! Controls auto-hide timer

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Sent when the idle window elapses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub epoch: u64,
}

/// Single-shot deferred hide of the controls.
///
/// Every [`reset`](Self::reset) cancels the pending shot and schedules a new
/// one under a fresh epoch; a fire is only honoured through
/// [`accept`](Self::accept) if it belongs to the armed epoch.
pub struct ControlsTimer {
    idle: Duration,
    epoch: u64,
    task: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<TimerFired>,
}

impl ControlsTimer {
    pub fn new(idle: Duration, tx: mpsc::UnboundedSender<TimerFired>) -> Self {
        Self {
            idle,
            epoch: 0,
            task: None,
            tx,
        }
    }

    pub fn idle(&self) -> Duration {
        self.idle
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }

    /// Cancel and reschedule
    pub fn reset(&mut self) {
        self.cancel();
        self.epoch += 1;

        let fired = TimerFired { epoch: self.epoch };
        let deadline = Instant::now() + self.idle;
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            sleep_until(deadline).await;
            let _ = tx.send(fired);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Consume a fire; true exactly once per armed epoch
    pub fn accept(&mut self, fired: TimerFired) -> bool {
        if self.task.is_some() && fired.epoch == self.epoch {
            self.task = None;
            true
        } else {
            false
        }
    }
}

impl Drop for ControlsTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_millis(5000);

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_idle_window() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = ControlsTimer::new(IDLE, tx);
        timer.reset();

        let fired = rx.recv().await.unwrap();
        assert!(timer.accept(fired));
        assert!(!timer.accept(fired));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_pushes_deadline() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = ControlsTimer::new(IDLE, tx);
        let start = Instant::now();
        timer.reset();

        tokio::time::advance(Duration::from_millis(4000)).await;
        timer.reset();

        let fired = rx.recv().await.unwrap();
        assert!(timer.accept(fired));
        assert_eq!(start.elapsed(), Duration::from_millis(9000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fire_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timer = ControlsTimer::new(IDLE, tx);
        timer.reset();
        let stale = TimerFired { epoch: 1 };
        timer.reset();

        assert!(!timer.accept(stale));
        assert!(timer.accept(TimerFired { epoch: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_fire() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = ControlsTimer::new(IDLE, tx);
        timer.reset();
        timer.cancel();

        tokio::time::advance(IDLE * 2).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
        assert!(!timer.accept(TimerFired { epoch: 1 }));
    }
}
