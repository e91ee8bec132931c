//! Shared engine state.
//!
//! Bundles the core components every request handler needs:
//! - Call record store (the only shared mutable resource)
//! - Actor and contact directories (read-only)
//! - Routing and caller-ID resolvers
//! - Carrier client and token issuer
//! - Event reconciler
//!
//! Everything is constructor-injected here once and shared behind an `Arc`;
//! no component reaches for process-wide state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::carrier::{HttpCarrierClient, MockCarrierClient, SharedCarrierClient};
use crate::config::Config;
use crate::directory::{InMemoryDirectory, SharedActorDirectory, SharedContactDirectory};
use crate::error::Result;
use crate::reconcile::Reconciler;
use crate::routing::{CallerIdResolver, RoutingResolver};
use crate::store::{InMemoryCallStore, SharedCallStore};
use crate::token::TokenIssuer;

/// Shared engine state, passed to every handler.
pub struct EngineState {
    pub store: SharedCallStore,
    pub actors: SharedActorDirectory,
    pub contacts: SharedContactDirectory,
    pub routing: RoutingResolver,
    pub caller_id: CallerIdResolver,
    pub carrier: SharedCarrierClient,
    pub tokens: TokenIssuer,
    pub reconciler: Reconciler,
    pub config: Arc<Config>,

    start_time: Instant,
    healthy: AtomicBool,
    ready: AtomicBool,
}

impl EngineState {
    /// Assemble the engine from configuration.
    pub fn new(config: Arc<Config>) -> Result<SharedEngineState> {
        let directory = Arc::new(InMemoryDirectory::from_config(&config.directory));
        let actors: SharedActorDirectory = directory.clone();
        let contacts: SharedContactDirectory = directory;

        let store: SharedCallStore = Arc::new(InMemoryCallStore::new());

        let carrier: SharedCarrierClient = if config.carrier.mock {
            Arc::new(MockCarrierClient::new())
        } else {
            // Run with whatever credentials exist; placement and token
            // requests fail per-request when material is missing.
            match HttpCarrierClient::from_config(&config.carrier) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    tracing::warn!(error = %e, "carrier not configured, calling disabled");
                    Arc::new(UnconfiguredCarrier)
                }
            }
        };

        let routing = RoutingResolver::new(actors.clone(), contacts.clone());
        let caller_id =
            CallerIdResolver::new(actors.clone(), config.carrier.shared_number.clone());
        let tokens = TokenIssuer::new(config.carrier.clone());
        let reconciler = Reconciler::new(store.clone(), config.carrier.shared_number.clone());

        Ok(Arc::new(Self {
            store,
            actors,
            contacts,
            routing,
            caller_id,
            carrier,
            tokens,
            reconciler,
            config,
            start_time: Instant::now(),
            healthy: AtomicBool::new(true),
            ready: AtomicBool::new(false),
        }))
    }

    /// Webhook URL for a path under the configured public base.
    pub fn webhook_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.carrier.webhook_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }
}

/// Shared engine state handle.
pub type SharedEngineState = Arc<EngineState>;

/// Placeholder carrier used when credentials are absent.
///
/// Keeps webhook handling and queries alive while every placement attempt
/// reports the configuration gap.
struct UnconfiguredCarrier;

#[async_trait::async_trait]
impl crate::carrier::CarrierClient for UnconfiguredCarrier {
    async fn create_call(
        &self,
        _request: &crate::carrier::CreateCall,
    ) -> Result<String> {
        Err(crate::error::Error::MissingConfiguration("carrier.account_sid"))
    }

    async fn end_call(&self, _correlation_id: &str) -> Result<()> {
        Err(crate::error::Error::MissingConfiguration("carrier.account_sid"))
    }
}
