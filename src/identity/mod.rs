//! Actor identity codec.
//!
//! Maps an application-level actor (operator N, sales rep M) to and from the
//! short handle used as the carrier-side client address for browser
//! endpoints. The codec is pure: it performs no lookups, and existence of
//! the actor is validated by the caller.
//!
//! Handle format: `{kind-tag}-{id}`, e.g. `operator-7`, `sales-42`. On the
//! wire the carrier prefixes registered client addresses with the `client:`
//! scheme (`client:operator-7`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Scheme prefix the carrier puts on registered client addresses.
const CLIENT_SCHEME: &str = "client:";

/// The two classes of human actors that place and receive calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// Dispatch operator.
    Operator,
    /// Sales representative.
    SalesRep,
}

impl ActorKind {
    /// Fixed handle tag for this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::SalesRep => "sales",
        }
    }

    /// Parse a handle tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "operator" => Some(Self::Operator),
            "sales" => Some(Self::SalesRep),
            _ => None,
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A decoded actor identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub kind: ActorKind,
    pub id: u32,
}

impl Identity {
    pub fn new(kind: ActorKind, id: u32) -> Self {
        Self { kind, id }
    }

    /// Encode to the short handle, e.g. `sales-42`.
    pub fn handle(&self) -> String {
        format!("{}-{}", self.kind.tag(), self.id)
    }

    /// The carrier-addressable form, e.g. `client:sales-42`.
    pub fn client_address(&self) -> String {
        format!("{}{}", CLIENT_SCHEME, self.handle())
    }

    /// Decode a handle.
    ///
    /// Fails with [`Error::MalformedIdentity`] unless the handle is
    /// `{kind-tag}-{digits}` with a known tag and a positive integer id.
    pub fn decode(handle: &str) -> Result<Self> {
        let malformed = || Error::MalformedIdentity(handle.to_string());

        let (tag, id_str) = handle.rsplit_once('-').ok_or_else(malformed)?;
        let kind = ActorKind::from_tag(tag).ok_or_else(malformed)?;

        if id_str.is_empty() || !id_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let id: u32 = id_str.parse().map_err(|_| malformed())?;
        if id == 0 {
            return Err(malformed());
        }

        Ok(Self { kind, id })
    }

    /// Decode a carrier-side address, tolerating both the `client:` scheme
    /// and a bare handle.
    ///
    /// Returns `None` for anything that is not a well-formed handle; callers
    /// treat such values as raw phone numbers.
    pub fn from_client_address(address: &str) -> Option<Self> {
        let handle = address.strip_prefix(CLIENT_SCHEME).unwrap_or(address);
        Self::decode(handle).ok()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.tag(), self.id)
    }
}

impl FromStr for Identity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}
