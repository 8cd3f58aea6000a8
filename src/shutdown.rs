//! Server-wide shutdown: a one-shot signal plus a join barrier.
//!
//! ```text
//!   session ──terminate──► stop()
//!                            │ 1. fire the signal       (sessions stop between frames,
//!                            │                           the acceptor stops accepting)
//!                            │ 2. wait for the barrier  (outstanding sessions == 0)
//!                            ▼ 3. close the listener
//! ```
//!
//! The signal is a [`CancellationToken`]: firing it is idempotent and every
//! current and future observer sees it. The join barrier counts live
//! sessions; each one holds a [`SessionGuard`] and the count drops when the
//! guard does. A session that calls [`ShutdownCoordinator::stop`] must drop
//! its own guard first, otherwise it waits for itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One-shot shutdown signal and join barrier shared by the whole server.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    signal: CancellationToken,
    close_listener: CancellationToken,
    fired: AtomicBool,
    sessions: watch::Sender<usize>,
}

impl ShutdownCoordinator {
    /// Creates a coordinator with the signal not fired and no sessions.
    pub fn new() -> Self {
        let (sessions, _) = watch::channel(0);
        Self {
            signal: CancellationToken::new(),
            close_listener: CancellationToken::new(),
            fired: AtomicBool::new(false),
            sessions,
        }
    }

    /// Fires the signal. Returns `true` only for the call that fired it.
    pub fn fire(&self) -> bool {
        let first = !self.fired.swap(true, Ordering::AcqRel);
        self.signal.cancel();
        first
    }

    /// Returns `true` once the signal has fired.
    pub fn is_fired(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Resolves when the signal fires.
    pub async fn fired(&self) {
        self.signal.cancelled().await
    }

    /// Registers a session on the join barrier.
    pub fn enter(self: &Arc<Self>) -> SessionGuard {
        self.sessions.send_modify(|n| *n += 1);
        SessionGuard {
            coordinator: Arc::clone(self),
        }
    }

    /// Number of sessions that have not released their guard yet.
    pub fn outstanding(&self) -> usize {
        *self.sessions.borrow()
    }

    /// Resolves when no session is outstanding.
    pub async fn drained(&self) {
        let mut sessions = self.sessions.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = sessions.wait_for(|n| *n == 0).await;
    }

    /// Fires the signal, waits for every session to exit, then closes the
    /// listener.
    ///
    /// Safe to call any number of times and from several tasks at once;
    /// every call returns once the drain is complete.
    pub async fn stop(&self) {
        if self.fire() {
            info!(
                outstanding = self.outstanding(),
                "shutdown requested, draining sessions"
            );
        }
        self.drained().await;
        if !self.close_listener.is_cancelled() {
            debug!("sessions drained, closing listener");
        }
        self.close_listener.cancel();
    }

    /// Returns `true` once the drain is complete and the listener must close.
    pub fn is_listener_closing(&self) -> bool {
        self.close_listener.is_cancelled()
    }

    /// Resolves when the listener must close.
    pub async fn listener_closing(&self) {
        self.close_listener.cancelled().await
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// A session's slot on the join barrier, released on drop.
#[derive(Debug)]
#[must_use = "dropping the guard releases the session slot immediately"]
pub struct SessionGuard {
    coordinator: Arc<ShutdownCoordinator>,
}

impl SessionGuard {
    /// Releases the slot. Same as dropping the guard.
    pub fn release(self) {}
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.coordinator
            .sessions
            .send_modify(|n| *n = n.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_fire_is_one_shot() {
        let coordinator = ShutdownCoordinator::new();
        assert!(!coordinator.is_fired());
        assert!(coordinator.fire());
        assert!(!coordinator.fire());
        assert!(coordinator.is_fired());
    }

    #[test]
    fn test_guards_count_sessions() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let a = coordinator.enter();
        let b = coordinator.enter();
        assert_eq!(coordinator.outstanding(), 2);
        a.release();
        assert_eq!(coordinator.outstanding(), 1);
        drop(b);
        assert_eq!(coordinator.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_stop_without_sessions() {
        let coordinator = ShutdownCoordinator::new();
        timeout(Duration::from_secs(1), coordinator.stop())
            .await
            .unwrap();
        assert!(coordinator.is_fired());
        assert!(coordinator.is_listener_closing());
    }

    #[tokio::test]
    async fn test_stop_waits_for_sessions() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let guard = coordinator.enter();

        let stopper = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.stop().await })
        };

        timeout(Duration::from_secs(1), coordinator.fired())
            .await
            .unwrap();
        tokio::task::yield_now().await;
        assert!(!coordinator.is_listener_closing());
        assert!(!stopper.is_finished());

        drop(guard);
        timeout(Duration::from_secs(1), stopper)
            .await
            .unwrap()
            .unwrap();
        assert!(coordinator.is_listener_closing());
    }

    #[tokio::test]
    async fn test_stop_from_a_session_releasing_first() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let guard = coordinator.enter();

        let session = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                guard.release();
                coordinator.stop().await;
            })
        };

        timeout(Duration::from_secs(1), session)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(coordinator.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_stop_calls() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let guard = coordinator.enter();

        let mut stoppers = vec![];
        for _ in 0..4 {
            let coordinator = Arc::clone(&coordinator);
            stoppers.push(tokio::spawn(async move { coordinator.stop().await }));
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(guard);

        for stopper in stoppers {
            timeout(Duration::from_secs(1), stopper)
                .await
                .unwrap()
                .unwrap();
        }
        assert!(!coordinator.fire());
    }

    #[tokio::test]
    async fn test_signal_visible_to_late_observers() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        coordinator.fire();

        let late = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.fired().await })
        };
        timeout(Duration::from_secs(1), late)
            .await
            .unwrap()
            .unwrap();
    }
}
