//! HTTP server.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::bootstrap::{SharedEngineState, Shutdown, ShutdownState};
use crate::config::HttpConfig;

use super::handlers::{
    call_metrics_handler, end_call_handler, health_handler, list_calls_handler, live_handler,
    metrics_handler, place_call_handler, ready_handler, recent_calls_handler, recording_handler,
    stats_handler, status_handler, token_handler, voice_handler,
};

/// The engine's HTTP surface: carrier webhooks, the actor-facing API, and
/// operational endpoints.
pub struct ApiServer {
    config: HttpConfig,
    state: SharedEngineState,
    shutdown: Arc<Shutdown>,
}

impl ApiServer {
    /// Create a new server.
    pub fn new(config: &HttpConfig, state: SharedEngineState, shutdown: Arc<Shutdown>) -> Self {
        Self {
            config: config.clone(),
            state,
            shutdown,
        }
    }

    /// Build the router.
    pub fn build_router(&self) -> Router {
        Router::new()
            // Carrier webhooks
            .route("/webhooks/voice", post(voice_handler))
            .route("/webhooks/status", post(status_handler))
            .route("/webhooks/recording", post(recording_handler))
            // Actor-facing API
            .route("/token", get(token_handler))
            .route("/calls", post(place_call_handler).get(list_calls_handler))
            .route("/calls/recent", get(recent_calls_handler))
            .route("/calls/metrics", get(call_metrics_handler))
            .route("/calls/{correlation_id}", delete(end_call_handler))
            // Kubernetes-style health endpoints
            .route("/healthz", get(health_handler))
            .route("/livez", get(live_handler))
            .route("/readyz", get(ready_handler))
            // Metrics and stats
            .route("/stats", get(stats_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state.clone())
    }

    /// Run the server until shutdown.
    pub async fn run(self) -> std::io::Result<()> {
        let router = self.build_router();
        let addr = self.config.address;

        info!(address = %addr, "starting http server");

        let listener = TcpListener::bind(addr).await?;
        self.state.set_ready(true);

        let mut shutdown_rx = self.shutdown.subscribe();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                    if *shutdown_rx.borrow_and_update() != ShutdownState::Running {
                        info!("http server shutting down");
                        break;
                    }
                }
            })
            .await?;

        Ok(())
    }
}
