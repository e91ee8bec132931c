use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Root configuration for callbridge
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server (webhooks + actor-facing API)
    #[serde(default)]
    pub http: HttpConfig,

    /// Voice carrier account and addressing
    #[serde(default)]
    pub carrier: CarrierConfig,

    /// Call engine behavior
    #[serde(default)]
    pub engine: EngineConfig,

    /// Actor and contact directories
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Bind address
    #[serde(default = "default_http_address")]
    pub address: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: default_http_address(),
        }
    }
}

fn default_http_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8085))
}

/// Voice carrier configuration.
///
/// Credential fields are optional at load time; call placement and token
/// issuance fail per-request with a missing-configuration error when they
/// are absent. `shared_number` and `webhook_base_url` are required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarrierConfig {
    /// Carrier account identifier
    pub account_sid: Option<String>,

    /// REST API auth token
    pub auth_token: Option<String>,

    /// Signing key id for access tokens
    pub api_key: Option<String>,

    /// Signing secret for access tokens
    pub api_secret: Option<String>,

    /// Application sid the browser SDK dials through
    pub app_sid: Option<String>,

    /// Shared outbound caller-ID used when an actor has no assigned number
    #[serde(default)]
    pub shared_number: String,

    /// Base URL of the carrier REST API
    #[serde(default = "default_carrier_base_url")]
    pub base_url: String,

    /// Public base URL the carrier calls back into
    #[serde(default)]
    pub webhook_base_url: String,

    /// Timeout for carrier REST requests
    #[serde(default = "default_carrier_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Lifetime of issued access tokens
    #[serde(default = "default_token_ttl", with = "humantime_serde")]
    pub token_ttl: Duration,

    /// Mock mode - no carrier API calls, synthetic correlation ids
    #[serde(default)]
    pub mock: bool,
}

fn default_carrier_base_url() -> String {
    "https://api.carrier.example.com/2010-04-01".to_string()
}

fn default_carrier_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_token_ttl() -> Duration {
    Duration::from_secs(3600)
}

/// Call engine behavior
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// How long an inbound leg rings a client before being abandoned
    #[serde(default = "default_dial_timeout", with = "humantime_serde")]
    pub dial_timeout: Duration,

    /// Default page size for recent-call queries
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,

    /// Hard cap on query page size
    #[serde(default = "default_max_query_limit")]
    pub max_query_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dial_timeout: default_dial_timeout(),
            recent_limit: default_recent_limit(),
            max_query_limit: default_max_query_limit(),
        }
    }
}

fn default_dial_timeout() -> Duration {
    Duration::from_secs(25)
}

fn default_recent_limit() -> usize {
    10
}

fn default_max_query_limit() -> usize {
    100
}

/// Actor and contact directories.
///
/// These stand in for the surrounding platform's user and CRM tables; the
/// engine only reads them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryConfig {
    /// Dispatch operators
    #[serde(default)]
    pub operators: Vec<ActorEntry>,

    /// Sales representatives
    #[serde(default)]
    pub sales_reps: Vec<ActorEntry>,

    /// CRM contacts, for caller lookup
    #[serde(default)]
    pub contacts: Vec<ContactEntry>,
}

/// A directory actor
#[derive(Debug, Clone, Deserialize)]
pub struct ActorEntry {
    /// Actor id (positive)
    pub id: u32,

    /// Display name
    pub name: String,

    /// Dedicated inbound/caller-ID number, if assigned
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// A CRM contact
#[derive(Debug, Clone, Deserialize)]
pub struct ContactEntry {
    /// Contact id
    pub id: u32,

    /// Display name
    pub name: String,

    /// Contact phone number
    pub phone_number: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON logs instead of pretty format
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
