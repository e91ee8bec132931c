//! Outbound caller-ID resolution.

use tracing::trace;

use crate::directory::{ActorDirectory, SharedActorDirectory};
use crate::identity::Identity;

/// Resolves the caller-ID presented on outbound legs.
///
/// An actor's assigned number wins; absence of an assignment is expected and
/// degrades to the shared default number. Consulted exactly once per
/// outbound call, at control-document generation time.
pub struct CallerIdResolver {
    directory: SharedActorDirectory,
    default_number: String,
}

impl CallerIdResolver {
    pub fn new(directory: SharedActorDirectory, default_number: impl Into<String>) -> Self {
        Self {
            directory,
            default_number: default_number.into(),
        }
    }

    /// Resolve the outbound caller-ID for an actor. Never fails.
    pub fn resolve(&self, identity: &Identity) -> String {
        let assigned = self
            .directory
            .lookup(identity.kind, identity.id)
            .and_then(|actor| actor.assigned_number)
            .filter(|number| !number.trim().is_empty());

        match assigned {
            Some(number) => {
                trace!(identity = %identity, caller_id = %number, "using assigned caller-ID");
                number
            }
            None => {
                trace!(identity = %identity, "no assigned number, using shared caller-ID");
                self.default_number.clone()
            }
        }
    }
}
