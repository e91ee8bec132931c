//! Inbound and outbound routing decisions.

use tracing::{debug, warn};

use crate::directory::{
    Actor, ActorDirectory, ContactDirectory, SharedActorDirectory, SharedContactDirectory,
};
use crate::identity::Identity;

use super::normalize_number;

/// Where an outbound leg should be dialed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialTarget {
    /// A registered browser client endpoint.
    Client(Identity),
    /// A PSTN phone number.
    Number(String),
}

/// Routing decisions over the actor and contact directories.
pub struct RoutingResolver {
    actors: SharedActorDirectory,
    contacts: SharedContactDirectory,
}

impl RoutingResolver {
    pub fn new(actors: SharedActorDirectory, contacts: SharedContactDirectory) -> Self {
        Self { actors, contacts }
    }

    /// Route an inbound call by its dialed number.
    ///
    /// `None` means undeliverable; the control-document layer renders a
    /// rejection rather than erroring.
    pub fn resolve_inbound(&self, dialed_number: &str) -> Option<Actor> {
        match self.actors.lookup_by_assigned_number(dialed_number) {
            Some(actor) => {
                debug!(
                    dialed = %dialed_number,
                    actor = %actor.identity(),
                    "inbound call routed"
                );
                Some(actor)
            }
            None => {
                warn!(dialed = %dialed_number, "inbound call matched no actor");
                None
            }
        }
    }

    /// Best-effort CRM contact lookup for a caller number.
    ///
    /// A miss is not an error; the call record simply carries no contact.
    pub fn lookup_contact(&self, caller_number: &str) -> Option<u32> {
        self.contacts.lookup_by_number(caller_number)
    }

    /// Classify an outbound destination.
    ///
    /// Handle-shaped destinations target a registered client; anything else
    /// is dialed as a PSTN number (normalized when possible).
    pub fn resolve_outbound(&self, destination: &str) -> DialTarget {
        if let Some(identity) = Identity::from_client_address(destination) {
            return DialTarget::Client(identity);
        }

        let number = normalize_number(destination)
            .unwrap_or_else(|| destination.trim().to_string());
        DialTarget::Number(number)
    }
}
