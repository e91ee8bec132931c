//! Call record storage.
//!
//! The single source of truth for call attempts and their current state.
//! All mutation funnels through two idempotent entry points:
//! [`CallStore::upsert_initial`] (the synchronous call-placement and voice
//! webhook paths) and [`CallStore::apply_event`] (the reconciler), so the
//! same call arriving through racing paths converges on one record.
//!
//! # Implementations
//!
//! - [`InMemoryCallStore`]: volatile, for development and testing; the
//!   trait keeps the seam for a database-backed store.

mod memory;
pub mod types;

pub use memory::InMemoryCallStore;
pub use types::*;

use std::sync::Arc;

use crate::error::Result;
use crate::identity::Identity;

/// Seed data used when an event arrives for an unseen correlation id.
///
/// Best-effort backfill only; the authoritative first write is the
/// synchronous path when it wins the race.
#[derive(Debug, Clone)]
pub struct RecordSeed {
    pub direction: CallDirection,
    pub from_number: String,
    pub to_number: String,
    pub owner: Option<Identity>,
    pub contact_id: Option<u32>,
}

/// Outcome of a recording attachment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingAttach {
    /// URL stored on the record
    Attached,
    /// The record already carries a recording; the URL was not overwritten
    AlreadySet,
    /// No record exists for the correlation id
    NotFound,
}

/// Call record store.
///
/// All implementations must be thread-safe; the read-modify-write in
/// `apply_event` must hold the record's critical section for the whole
/// ordering decision so concurrent events for one call cannot both win.
pub trait CallStore: Send + Sync {
    /// Idempotent first write for a call.
    ///
    /// Creates the record if the correlation id is unseen; otherwise fills
    /// in a missing owner/contact from `record` and returns the stored
    /// record. Never overwrites existing fields.
    fn upsert_initial(&self, record: CallRecord) -> Result<CallRecord>;

    /// Get a record by correlation id.
    fn get(&self, correlation_id: &str) -> Result<Option<CallRecord>>;

    /// Apply a lifecycle event, creating the record from `seed` if absent.
    ///
    /// Returns the record after application together with the transition
    /// decision; out-of-order and duplicate events are absorbed as no-ops
    /// per the status ordering policy.
    fn apply_event(
        &self,
        correlation_id: &str,
        event: CallEvent,
        seed: &RecordSeed,
    ) -> Result<(CallRecord, Applied)>;

    /// Attach a recording URL, at most once per call.
    fn attach_recording(&self, correlation_id: &str, url: &str) -> Result<RecordingAttach>;

    /// Query records matching a filter, newest-first.
    fn query(&self, query: &CallQuery) -> Result<Vec<CallRecord>>;

    /// Aggregate statistics, optionally scoped to one owner.
    fn stats(&self, owner: Option<&Identity>) -> Result<CallStats>;
}

/// Shared store handle.
pub type SharedCallStore = Arc<dyn CallStore>;
