//! Carrier REST API client.
//!
//! Places and terminates calls through the voice carrier. The client is
//! constructor-injected into everything that needs it; components never
//! reach for process-wide state. Mock mode serves tests and local
//! development without carrier credentials.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::CarrierConfig;
use crate::error::{Error, Result};

/// Parameters for an outbound call-creation request.
#[derive(Debug, Clone)]
pub struct CreateCall {
    /// Destination: a PSTN number or a `client:` address
    pub to: String,
    /// Presented caller-ID
    pub from: String,
    /// Where the carrier fetches the control document for the leg
    pub voice_url: String,
    /// Where the carrier posts status events
    pub status_callback: String,
}

/// Async seam to the carrier's call-control API.
#[async_trait]
pub trait CarrierClient: Send + Sync {
    /// Create an outbound call. Returns the carrier-assigned correlation id.
    async fn create_call(&self, request: &CreateCall) -> Result<String>;

    /// Ask the carrier to complete an active call.
    async fn end_call(&self, correlation_id: &str) -> Result<()>;
}

pub type SharedCarrierClient = std::sync::Arc<dyn CarrierClient>;

/// Carrier call resource, as returned by call creation.
#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
}

/// reqwest-backed carrier client.
pub struct HttpCarrierClient {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl HttpCarrierClient {
    /// Build from configuration.
    ///
    /// Fails with [`Error::MissingConfiguration`] when credential material
    /// is absent; callers surface this per-request as "calling temporarily
    /// unavailable" rather than attempting a doomed carrier call.
    pub fn from_config(config: &CarrierConfig) -> Result<Self> {
        let account_sid = require(&config.account_sid, "carrier.account_sid")?;
        let auth_token = require(&config.auth_token, "carrier.auth_token")?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::CarrierUnavailable(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_sid,
            auth_token,
        })
    }

    fn calls_url(&self) -> String {
        format!("{}/Accounts/{}/Calls.json", self.base_url, self.account_sid)
    }

    fn call_url(&self, correlation_id: &str) -> String {
        format!(
            "{}/Accounts/{}/Calls/{}.json",
            self.base_url, self.account_sid, correlation_id
        )
    }
}

#[async_trait]
impl CarrierClient for HttpCarrierClient {
    async fn create_call(&self, request: &CreateCall) -> Result<String> {
        debug!(to = %request.to, from = %request.from, "creating carrier call");

        let params = [
            ("To", request.to.as_str()),
            ("From", request.from.as_str()),
            ("Url", request.voice_url.as_str()),
            ("StatusCallback", request.status_callback.as_str()),
            ("StatusCallbackEvent", "initiated ringing answered completed"),
        ];

        let response = self
            .http
            .post(self.calls_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::CarrierUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::CarrierUnavailable(format!(
                "call creation returned {}",
                response.status()
            )));
        }

        let resource: CallResource = response
            .json()
            .await
            .map_err(|e| Error::CarrierUnavailable(format!("malformed carrier response: {e}")))?;

        info!(correlation_id = %resource.sid, to = %request.to, "carrier call created");
        Ok(resource.sid)
    }

    async fn end_call(&self, correlation_id: &str) -> Result<()> {
        debug!(correlation_id, "ending carrier call");

        let response = self
            .http
            .post(self.call_url(correlation_id))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("Status", "completed")])
            .send()
            .await
            .map_err(|e| Error::CarrierUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::CarrierUnavailable(format!(
                "call termination returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

fn require(value: &Option<String>, name: &'static str) -> Result<String> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .ok_or(Error::MissingConfiguration(name))
}

/// In-process carrier stand-in.
///
/// Returns synthetic correlation ids and remembers every request so tests
/// can assert on what would have gone over the wire.
pub struct MockCarrierClient {
    counter: AtomicU64,
    created: Mutex<Vec<CreateCall>>,
    ended: Mutex<Vec<String>>,
}

impl MockCarrierClient {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
            created: Mutex::new(Vec::new()),
            ended: Mutex::new(Vec::new()),
        }
    }

    /// Requests passed to `create_call`, in order.
    pub fn created(&self) -> Vec<CreateCall> {
        self.created.lock().expect("mock lock").clone()
    }

    /// Correlation ids passed to `end_call`, in order.
    pub fn ended(&self) -> Vec<String> {
        self.ended.lock().expect("mock lock").clone()
    }
}

impl Default for MockCarrierClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CarrierClient for MockCarrierClient {
    async fn create_call(&self, request: &CreateCall) -> Result<String> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.created.lock().expect("mock lock").push(request.clone());
        Ok(format!("CA-mock-{n}"))
    }

    async fn end_call(&self, correlation_id: &str) -> Result<()> {
        self.ended
            .lock()
            .expect("mock lock")
            .push(correlation_id.to_string());
        Ok(())
    }
}
