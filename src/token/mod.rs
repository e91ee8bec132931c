//! Carrier access token issuance.
//!
//! Issues the short-lived credential an actor's browser uses to register
//! with the carrier as a dialable endpoint under its identity handle. The
//! token is an HS256 JWT signed with the carrier API secret, scoped to
//! exactly one identity.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::CarrierConfig;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::telemetry::counters;

/// An issued voice credential.
#[derive(Debug, Clone, Serialize)]
pub struct VoiceToken {
    /// Signed JWT for the carrier browser SDK
    pub token: String,
    /// The identity handle the token is scoped to
    pub identity: String,
    /// Seconds until expiry
    pub expires_in: u64,
}

/// Token claims in the carrier's federated-auth shape.
#[derive(Debug, Serialize, Deserialize)]
struct VoiceClaims {
    jti: String,
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
    grants: Grants,
}

#[derive(Debug, Serialize, Deserialize)]
struct Grants {
    identity: String,
    voice: VoiceGrant,
}

#[derive(Debug, Serialize, Deserialize)]
struct VoiceGrant {
    outgoing: OutgoingGrant,
    incoming_allow: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OutgoingGrant {
    application_sid: String,
}

/// Issues voice credentials scoped to one actor identity.
///
/// Holds the raw configuration and validates it per request: absent
/// credential material is an ops condition that must fail fast at call
/// time, not at startup.
pub struct TokenIssuer {
    config: CarrierConfig,
}

impl TokenIssuer {
    pub fn new(config: CarrierConfig) -> Self {
        Self { config }
    }

    /// Issue a credential for the given identity.
    pub fn issue(&self, identity: &Identity) -> Result<VoiceToken> {
        let account_sid = require(&self.config.account_sid, "carrier.account_sid")?;
        let api_key = require(&self.config.api_key, "carrier.api_key")?;
        let api_secret = require(&self.config.api_secret, "carrier.api_secret")?;
        let app_sid = require(&self.config.app_sid, "carrier.app_sid")?;

        let handle = identity.handle();
        let now = Utc::now();
        let ttl = self.config.token_ttl.as_secs();

        let claims = VoiceClaims {
            jti: format!("{}-{}", api_key, Uuid::new_v4()),
            iss: api_key,
            sub: account_sid,
            iat: now.timestamp(),
            exp: now.timestamp() + ttl as i64,
            grants: Grants {
                identity: handle.clone(),
                voice: VoiceGrant {
                    outgoing: OutgoingGrant {
                        application_sid: app_sid,
                    },
                    incoming_allow: true,
                },
            },
        };

        // HS256 signing only fails on unusable key material
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(api_secret.as_bytes()),
        )
        .map_err(|_| Error::MissingConfiguration("carrier.api_secret"))?;

        info!(identity = %handle, expires_in = ttl, "voice token issued");
        counters::token_issued();

        Ok(VoiceToken {
            token,
            identity: handle,
            expires_in: ttl,
        })
    }
}

fn require(value: &Option<String>, name: &'static str) -> Result<String> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .ok_or(Error::MissingConfiguration(name))
}
