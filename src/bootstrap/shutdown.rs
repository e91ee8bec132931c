use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Shutdown state machine.
///
/// States:
/// 1. Running - normal operation
/// 2. Draining - stop accepting new work, finish in-flight requests
/// 3. Terminated - server stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Draining,
    Terminated,
}

/// Broadcasts shutdown progression to server tasks.
pub struct Shutdown {
    state: watch::Sender<ShutdownState>,
}

impl Shutdown {
    pub fn new() -> Arc<Self> {
        let (state, _) = watch::channel(ShutdownState::Running);
        Arc::new(Self { state })
    }

    /// Current state.
    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ShutdownState> {
        self.state.subscribe()
    }

    /// Begin draining (called on SIGTERM/SIGINT).
    pub fn begin(&self) {
        if self.state() != ShutdownState::Running {
            return;
        }
        info!("starting graceful shutdown");
        let _ = self.state.send(ShutdownState::Draining);
    }

    /// Mark shutdown complete.
    pub fn terminate(&self) {
        if self.state() == ShutdownState::Terminated {
            return;
        }
        info!("shutdown complete");
        let _ = self.state.send(ShutdownState::Terminated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_progression() {
        let shutdown = Shutdown::new();
        assert_eq!(shutdown.state(), ShutdownState::Running);

        let mut rx = shutdown.subscribe();

        shutdown.begin();
        assert_eq!(shutdown.state(), ShutdownState::Draining);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ShutdownState::Draining);

        // begin is idempotent and never regresses the state
        shutdown.begin();
        assert_eq!(shutdown.state(), ShutdownState::Draining);

        shutdown.terminate();
        assert_eq!(shutdown.state(), ShutdownState::Terminated);
    }
}
