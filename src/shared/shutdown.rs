//! Graceful shutdown handling
//!
//! [`ShutdownSignal`] is the cancellable lifetime shared by the scheduler's
//! job loops and the HTTP server. Cancelling it stops every loop at its next
//! wait point; work already in flight is allowed to finish.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

/// Cancellable lifetime. Clones observe the same state.
#[derive(Clone)]
pub struct ShutdownSignal {
    state: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.state.borrow()
    }

    /// Cancel the lifetime. Idempotent.
    pub fn trigger(&self) {
        let first = self.state.send_if_modified(|triggered| {
            let changed = !*triggered;
            *triggered = true;
            changed
        });
        if first {
            info!("🛑 Shutdown signal triggered");
        }
    }

    /// Resolve once the signal has been triggered, immediately if it already was.
    pub async fn wait(&self) {
        let mut state = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = state.wait_for(|triggered| *triggered).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve on the first SIGTERM or Ctrl+C. Returns `false` if no handler
/// could be installed.
async fn os_signal() -> bool {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                return false;
            }
        };
        tokio::select! {
            _ = term.recv() => info!("📡 Received SIGTERM"),
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => info!("📡 Received Ctrl+C"),
                Err(e) => {
                    warn!("Failed to install Ctrl+C handler: {}", e);
                    return false;
                }
            },
        }
        true
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("📡 Received Ctrl+C");
                true
            }
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                false
            }
        }
    }
}

/// Graceful shutdown coordinator
pub struct ShutdownCoordinator {
    signal: ShutdownSignal,
    timeout_secs: u64,
}

impl ShutdownCoordinator {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            signal: ShutdownSignal::new(),
            timeout_secs,
        }
    }

    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    pub fn start_signal_listener(&self) {
        let signal = self.signal.clone();
        tokio::spawn(async move {
            if os_signal().await {
                signal.trigger();
            }
        });
    }

    /// Wait for the signal, then give `cleanup` at most the configured timeout.
    pub async fn shutdown_with_cleanup<F, Fut>(&self, cleanup: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        self.signal.wait().await;
        info!(
            "⏳ Starting graceful shutdown (timeout: {}s)...",
            self.timeout_secs
        );

        match tokio::time::timeout(Duration::from_secs(self.timeout_secs), cleanup()).await {
            Ok(()) => {
                info!("✅ Graceful shutdown completed");
                true
            }
            Err(_) => {
                warn!("⚠️ Graceful shutdown timed out after {}s", self.timeout_secs);
                false
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(30)
    }
}
