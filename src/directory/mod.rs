//! Actor and contact directories.
//!
//! External collaborators of the call engine, specified at their interface
//! boundary: the engine reads them and never writes. The in-memory
//! implementation is seeded from configuration and indexes assigned numbers
//! for inbound routing.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DirectoryConfig;
use crate::identity::{ActorKind, Identity};
use crate::routing::normalize_number;

/// A directory actor.
#[derive(Debug, Clone)]
pub struct Actor {
    pub kind: ActorKind,
    pub id: u32,
    pub name: String,
    /// Dedicated number for inbound routing and outbound caller-ID.
    pub assigned_number: Option<String>,
}

impl Actor {
    /// The actor's codec identity.
    pub fn identity(&self) -> Identity {
        Identity::new(self.kind, self.id)
    }
}

/// Read-only actor lookup.
pub trait ActorDirectory: Send + Sync {
    /// Look up an actor by kind and id.
    fn lookup(&self, kind: ActorKind, id: u32) -> Option<Actor>;

    /// Look up the actor that owns an assigned number, if exactly one does.
    fn lookup_by_assigned_number(&self, number: &str) -> Option<Actor>;
}

/// Read-only, best-effort contact lookup.
pub trait ContactDirectory: Send + Sync {
    /// Find the CRM contact id for a caller number.
    fn lookup_by_number(&self, number: &str) -> Option<u32>;
}

pub type SharedActorDirectory = Arc<dyn ActorDirectory>;
pub type SharedContactDirectory = Arc<dyn ContactDirectory>;

/// Config-seeded in-memory directory.
pub struct InMemoryDirectory {
    actors: HashMap<(ActorKind, u32), Actor>,
    by_number: HashMap<String, (ActorKind, u32)>,
    contacts_by_number: HashMap<String, u32>,
}

impl InMemoryDirectory {
    pub fn from_config(config: &DirectoryConfig) -> Self {
        let mut actors = HashMap::new();
        let mut by_number = HashMap::new();
        let mut contacts_by_number = HashMap::new();

        let entries = config
            .operators
            .iter()
            .map(|e| (ActorKind::Operator, e))
            .chain(config.sales_reps.iter().map(|e| (ActorKind::SalesRep, e)));

        for (kind, entry) in entries {
            let actor = Actor {
                kind,
                id: entry.id,
                name: entry.name.clone(),
                assigned_number: entry.phone_number.clone(),
            };
            if let Some(normalized) = entry.phone_number.as_deref().and_then(normalize_number) {
                by_number.insert(normalized, (kind, entry.id));
            }
            actors.insert((kind, entry.id), actor);
        }

        for contact in &config.contacts {
            if let Some(normalized) = normalize_number(&contact.phone_number) {
                contacts_by_number.insert(normalized, contact.id);
            }
        }

        Self {
            actors,
            by_number,
            contacts_by_number,
        }
    }
}

impl ActorDirectory for InMemoryDirectory {
    fn lookup(&self, kind: ActorKind, id: u32) -> Option<Actor> {
        self.actors.get(&(kind, id)).cloned()
    }

    fn lookup_by_assigned_number(&self, number: &str) -> Option<Actor> {
        let normalized = normalize_number(number)?;
        let key = self.by_number.get(&normalized)?;
        self.actors.get(key).cloned()
    }
}

impl ContactDirectory for InMemoryDirectory {
    fn lookup_by_number(&self, number: &str) -> Option<u32> {
        let normalized = normalize_number(number)?;
        self.contacts_by_number.get(&normalized).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActorEntry, ContactEntry};

    fn test_directory() -> InMemoryDirectory {
        InMemoryDirectory::from_config(&DirectoryConfig {
            operators: vec![ActorEntry {
                id: 7,
                name: "Dispatch Desk".into(),
                phone_number: Some("+15550001111".into()),
            }],
            sales_reps: vec![ActorEntry {
                id: 42,
                name: "Ada".into(),
                phone_number: None,
            }],
            contacts: vec![ContactEntry {
                id: 3,
                name: "Acme Trucking".into(),
                phone_number: "+1 (555) 765-4321".into(),
            }],
        })
    }

    #[test]
    fn test_lookup_by_id() {
        let dir = test_directory();
        let actor = dir.lookup(ActorKind::Operator, 7).unwrap();
        assert_eq!(actor.name, "Dispatch Desk");
        assert!(dir.lookup(ActorKind::Operator, 8).is_none());
        assert!(dir.lookup(ActorKind::SalesRep, 7).is_none());
    }

    #[test]
    fn test_lookup_by_assigned_number_normalizes() {
        let dir = test_directory();
        let actor = dir.lookup_by_assigned_number("+1 (555) 000-1111").unwrap();
        assert_eq!(actor.identity(), Identity::new(ActorKind::Operator, 7));
        assert!(dir.lookup_by_assigned_number("+15559990000").is_none());
    }

    #[test]
    fn test_contact_lookup() {
        let dir = test_directory();
        assert_eq!(dir.lookup_by_number("+15557654321"), Some(3));
        assert_eq!(dir.lookup_by_number("+15550000000"), None);
    }
}
