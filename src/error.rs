//! Engine error taxonomy.
//!
//! Only storage and carrier-transport failures propagate to callers; decode
//! and lookup misses are recovered locally with a fallback (raw-number
//! dialing, shared caller-ID, rejection documents). Duplicate or reordered
//! webhook events are never errors.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors surfaced by the call engine.
#[derive(Debug, Error)]
pub enum Error {
    /// An identity handle failed to decode.
    ///
    /// Callers fall back to treating the value as a raw phone number; this
    /// only escapes when a handle was explicitly required.
    #[error("malformed identity handle: {0}")]
    MalformedIdentity(String),

    /// An inbound dialed number matched no actor.
    ///
    /// Surfaced to the carrier as a rejection control document, not as an
    /// application error.
    #[error("no actor is assigned to {0}")]
    RoutingUnresolved(String),

    /// The carrier REST API failed or timed out.
    #[error("carrier unavailable: {0}")]
    CarrierUnavailable(String),

    /// The call record store is unreachable.
    ///
    /// Webhook handlers report this upstream so the carrier redelivers.
    #[error("call record storage failure: {0}")]
    Storage(String),

    /// Carrier credential material is absent from the configuration.
    #[error("carrier configuration incomplete: missing {0}")]
    MissingConfiguration(&'static str),
}

impl Error {
    /// HTTP status for actor-facing responses.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedIdentity(_) | Self::RoutingUnresolved(_) => StatusCode::BAD_REQUEST,
            Self::CarrierUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingConfiguration(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message shown to the requesting actor.
    ///
    /// Configuration gaps are an ops condition; actors only need to know
    /// that calling is down, not which key is absent.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingConfiguration(_) => "calling is temporarily unavailable".to_string(),
            Self::CarrierUnavailable(_) => "failed to initiate call".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
