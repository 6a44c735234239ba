//! The pause gate.
//!
//! A level-triggered gate built on a `tokio::sync::watch` channel. The loop
//! awaits the gate at the top of each iteration; `pause()` raises it,
//! `resume()` lowers it. Because the gate is level-triggered rather than
//! edge-triggered, a `resume()` arriving before the loop observes the pause
//! is never lost, and a second `pause()` while already paused installs no
//! extra state to unwind. Stop cancels the wait through the loop's
//! cancellation token, so a waiting loop can never deadlock.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Level-triggered pause gate shared between a loop and its controls.
#[derive(Debug)]
pub(crate) struct PauseGate {
    paused: watch::Sender<bool>,
}

impl PauseGate {
    /// New gate in the released (not paused) position.
    pub(crate) fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self { paused }
    }

    /// Raise the gate. Idempotent.
    pub(crate) fn pause(&self) {
        let _ = self.paused.send_replace(true);
    }

    /// Lower the gate, releasing any waiter. Idempotent.
    pub(crate) fn resume(&self) {
        let _ = self.paused.send_replace(false);
    }

    /// Whether the gate is currently raised.
    pub(crate) fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Block until the gate is lowered, or until cancellation.
    ///
    /// Returns `false` when the wait ended because of cancellation.
    pub(crate) async fn wait_released(&self, cancel: &CancellationToken) -> bool {
        let mut rx = self.paused.subscribe();
        loop {
            if !*rx.borrow_and_update() {
                return true;
            }
            tokio::select! {
                () = cancel.cancelled() => return false,
                changed = rx.changed() => {
                    if changed.is_err() {
                        // Sender dropped: the loop owner is gone, stop waiting
                        return true;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn released_gate_passes_immediately() {
        let gate = PauseGate::new();
        let cancel = CancellationToken::new();
        assert!(gate.wait_released(&cancel).await);
    }

    #[tokio::test]
    async fn resume_before_wait_is_not_lost() {
        let gate = PauseGate::new();
        gate.pause();
        gate.resume();
        let cancel = CancellationToken::new();
        assert!(gate.wait_released(&cancel).await);
    }

    #[tokio::test]
    async fn double_pause_released_by_single_resume() {
        let gate = PauseGate::new();
        gate.pause();
        gate.pause();
        assert!(gate.is_paused());
        gate.resume();
        assert!(!gate.is_paused());
        let cancel = CancellationToken::new();
        assert!(gate.wait_released(&cancel).await);
    }

    #[tokio::test]
    async fn resume_releases_a_waiter() {
        let gate = std::sync::Arc::new(PauseGate::new());
        gate.pause();
        let cancel = CancellationToken::new();
        let waiter = {
            let gate = gate.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { gate.wait_released(&cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        gate.resume();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn cancellation_releases_a_waiter() {
        let gate = std::sync::Arc::new(PauseGate::new());
        gate.pause();
        let cancel = CancellationToken::new();
        let waiter = {
            let gate = gate.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { gate.wait_released(&cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        // Cancellation reports false so the loop unwinds instead of stepping
        assert!(!waiter.await.unwrap());
    }
}
