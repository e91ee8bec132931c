//! Server assembly and lifecycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::http::ApiServer;

use super::{EngineState, Shutdown};

/// The callbridge server: engine state plus the HTTP surface, with
/// signal-driven graceful shutdown.
pub struct Server {
    config: Arc<Config>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Run until SIGINT/SIGTERM.
    pub async fn run(self) -> Result<()> {
        let state = EngineState::new(self.config.clone()).context("failed to build engine")?;
        let shutdown = Shutdown::new();

        spawn_signal_listener(shutdown.clone());

        let api = ApiServer::new(&self.config.http, state.clone(), shutdown.clone());
        api.run().await.context("http server failed")?;

        state.set_ready(false);
        shutdown.terminate();
        info!("server stopped");
        Ok(())
    }
}

/// Begin draining on SIGINT or SIGTERM.
fn spawn_signal_listener(shutdown: Arc<Shutdown>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            let _ = tokio::signal::ctrl_c().await;
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(_) => std::future::pending::<()>().await,
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("received SIGINT"),
            _ = terminate => info!("received SIGTERM"),
        }

        shutdown.begin();
    });
}
