//! In-memory call record store.
//!
//! Volatile storage for development and testing. All data is lost on
//! restart; call history meant to survive restarts belongs in a
//! database-backed implementation of the same trait.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::error::{Error, Result};
use crate::identity::Identity;

use super::types::*;
use super::{CallStore, RecordSeed, RecordingAttach};

/// Thread-safe in-memory store.
///
/// The write lock spans every read-modify-write, which subsumes the
/// per-correlation-id critical section the ordering policy needs: two
/// concurrent events for the same call serialize on the lock and the later
/// one sees the earlier one's state. No lock is ever held across carrier
/// I/O.
pub struct InMemoryCallStore {
    calls: RwLock<HashMap<String, CallRecord>>,
}

impl InMemoryCallStore {
    pub fn new() -> Self {
        Self {
            calls: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCallStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStore for InMemoryCallStore {
    fn upsert_initial(&self, record: CallRecord) -> Result<CallRecord> {
        let mut calls = self
            .calls
            .write()
            .map_err(|_| Error::Storage("call store lock poisoned".into()))?;

        match calls.get_mut(&record.correlation_id) {
            Some(existing) => {
                // A racing webhook created the record first; only fill gaps.
                if existing.owner.is_none() {
                    existing.owner = record.owner;
                }
                if existing.contact_id.is_none() {
                    existing.contact_id = record.contact_id;
                }
                Ok(existing.clone())
            }
            None => {
                debug!(
                    correlation_id = %record.correlation_id,
                    direction = record.direction.name(),
                    "call record created"
                );
                calls.insert(record.correlation_id.clone(), record.clone());
                Ok(record)
            }
        }
    }

    fn get(&self, correlation_id: &str) -> Result<Option<CallRecord>> {
        let calls = self
            .calls
            .read()
            .map_err(|_| Error::Storage("call store lock poisoned".into()))?;
        Ok(calls.get(correlation_id).cloned())
    }

    fn apply_event(
        &self,
        correlation_id: &str,
        event: CallEvent,
        seed: &RecordSeed,
    ) -> Result<(CallRecord, Applied)> {
        let mut calls = self
            .calls
            .write()
            .map_err(|_| Error::Storage("call store lock poisoned".into()))?;

        let record = calls.entry(correlation_id.to_string()).or_insert_with(|| {
            debug!(correlation_id, "call record created from webhook");
            let mut created = CallRecord::new(
                correlation_id,
                seed.direction,
                seed.from_number.clone(),
                seed.to_number.clone(),
            );
            created.owner = seed.owner;
            created.contact_id = seed.contact_id;
            created
        });

        // Owner backfill for records the reconciler itself created bare;
        // once set, ownership is never reassigned.
        if record.owner.is_none() {
            record.owner = seed.owner;
        }

        let applied = record.apply(&event);
        Ok((record.clone(), applied))
    }

    fn attach_recording(&self, correlation_id: &str, url: &str) -> Result<RecordingAttach> {
        let mut calls = self
            .calls
            .write()
            .map_err(|_| Error::Storage("call store lock poisoned".into()))?;

        let Some(record) = calls.get_mut(correlation_id) else {
            return Ok(RecordingAttach::NotFound);
        };

        if record.recording_url.is_some() {
            return Ok(RecordingAttach::AlreadySet);
        }

        record.recording_url = Some(url.to_string());
        record.updated_at = chrono::Utc::now();
        Ok(RecordingAttach::Attached)
    }

    fn query(&self, query: &CallQuery) -> Result<Vec<CallRecord>> {
        let calls = self
            .calls
            .read()
            .map_err(|_| Error::Storage("call store lock poisoned".into()))?;

        let mut matched: Vec<CallRecord> = calls
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = query.offset.unwrap_or(0);
        let matched: Vec<CallRecord> = match query.limit {
            Some(limit) => matched.into_iter().skip(offset).take(limit).collect(),
            None => matched.into_iter().skip(offset).collect(),
        };

        Ok(matched)
    }

    fn stats(&self, owner: Option<&Identity>) -> Result<CallStats> {
        let calls = self
            .calls
            .read()
            .map_err(|_| Error::Storage("call store lock poisoned".into()))?;

        let mut stats = CallStats::default();
        let mut duration_sum: u64 = 0;
        let mut duration_count: u64 = 0;

        for record in calls.values() {
            if let Some(owner) = owner {
                if record.owner.as_ref() != Some(owner) {
                    continue;
                }
            }

            stats.total += 1;
            match record.status {
                CallStatus::Initiated => stats.initiated += 1,
                CallStatus::Ringing => stats.ringing += 1,
                CallStatus::InProgress => stats.in_progress += 1,
                CallStatus::Completed => stats.completed += 1,
                CallStatus::Failed => stats.failed += 1,
            }

            if record.status == CallStatus::Completed {
                if let Some(duration) = record.duration_secs {
                    duration_sum += u64::from(duration);
                    duration_count += 1;
                }
            }
        }

        if stats.total > 0 {
            stats.completion_rate = stats.completed as f64 / stats.total as f64 * 100.0;
        }
        if duration_count > 0 {
            stats.average_duration_secs = duration_sum as f64 / duration_count as f64;
        }

        Ok(stats)
    }
}
