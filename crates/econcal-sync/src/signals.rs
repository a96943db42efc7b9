//! Process signals for the daemon.
//!
//! SIGTERM and SIGINT request a graceful shutdown; SIGUSR1 requests an
//! immediate sync cycle.

use std::io;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

/// Converts process signals into watch-channel updates.
///
/// Shutdown is a latched flag. Sync requests are a counter, so that a burst
/// of SIGUSR1 while a cycle is pending collapses into one request.
#[derive(Clone)]
pub struct SignalHandler {
    shutdown: Arc<watch::Sender<bool>>,
    sync_requests: Arc<watch::Sender<u64>>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            shutdown: Arc::new(watch::channel(false).0),
            sync_requests: Arc::new(watch::channel(0).0),
        }
    }

    /// Registers the OS handlers and spawns the task that listens on them.
    ///
    /// # Errors
    ///
    /// Fails if a handler cannot be registered.
    #[cfg(unix)]
    pub fn spawn_listener(&self) -> io::Result<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut user1 = signal(SignalKind::user_defined1())?;
        let handler = self.clone();

        tokio::spawn(async move {
            loop {
                let name = tokio::select! {
                    _ = terminate.recv() => "SIGTERM",
                    _ = interrupt.recv() => "SIGINT",
                    _ = user1.recv() => {
                        info!(signal = "SIGUSR1", "Sync requested");
                        handler.trigger_sync();
                        continue;
                    }
                };
                info!(signal = name, "Shutdown requested");
                handler.trigger_shutdown();
                break;
            }
            debug!("Signal listener stopped");
        });
        Ok(())
    }

    /// Ctrl+C only outside Unix.
    #[cfg(not(unix))]
    pub fn spawn_listener(&self) -> io::Result<()> {
        let handler = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!(signal = "ctrl-c", "Shutdown requested");
                handler.trigger_shutdown();
            }
        });
        Ok(())
    }

    /// Future-like value that resolves once shutdown is requested.
    pub fn shutdown(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.shutdown.subscribe(),
        }
    }

    /// Sync requests issued from now on.
    pub fn sync_requests(&self) -> SyncRequests {
        SyncRequests {
            rx: self.sync_requests.subscribe(),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Same effect as SIGUSR1.
    pub fn trigger_sync(&self) {
        self.sync_requests.send_modify(|n| *n = n.wrapping_add(1));
    }
}

/// Completes when shutdown is requested.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub async fn wait(mut self) {
        // A closed channel counts as shutdown.
        let _ = self.rx.wait_for(|requested| *requested).await;
    }
}

/// Stream of manual sync requests. Requests that arrive while one is
/// pending coalesce.
pub struct SyncRequests {
    rx: watch::Receiver<u64>,
}

impl SyncRequests {
    /// Waits for the next request. Returns false once no more can arrive.
    pub async fn next(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn shutdown_is_latched() {
        let handler = SignalHandler::new();
        assert!(!handler.is_shutdown());

        handler.trigger_shutdown();
        handler.trigger_shutdown();
        assert!(handler.is_shutdown());
    }

    #[tokio::test]
    async fn shutdown_wakes_waiters() {
        let handler = SignalHandler::new();
        let shutdown = handler.shutdown();

        let trigger = handler.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.trigger_shutdown();
        });

        let result = tokio::time::timeout(Duration::from_millis(500), shutdown.wait()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn late_waiter_sees_earlier_shutdown() {
        let handler = SignalHandler::new();
        handler.trigger_shutdown();

        let result = tokio::time::timeout(Duration::from_millis(50), handler.shutdown().wait()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn sync_requests_see_only_new_triggers() {
        let handler = SignalHandler::new();
        handler.trigger_sync();

        let mut requests = handler.sync_requests();
        let pending = tokio::time::timeout(Duration::from_millis(20), requests.next()).await;
        assert!(pending.is_err(), "trigger issued before subscribing must not fire");

        handler.trigger_sync();
        let fired = tokio::time::timeout(Duration::from_millis(500), requests.next()).await;
        assert_eq!(fired.ok(), Some(true));
    }

    #[tokio::test]
    async fn sync_requests_coalesce() {
        let handler = SignalHandler::new();
        let mut requests = handler.sync_requests();

        handler.trigger_sync();
        handler.trigger_sync();
        handler.trigger_sync();

        assert!(requests.next().await);
        let again = tokio::time::timeout(Duration::from_millis(20), requests.next()).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn requests_end_when_handler_is_gone() {
        let handler = SignalHandler::new();
        let mut requests = handler.sync_requests();
        drop(handler);

        assert!(!requests.next().await);
    }
}
