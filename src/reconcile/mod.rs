//! Carrier event reconciliation.
//!
//! Consumes asynchronous carrier webhooks and applies them to the call
//! record store:
//! 1. Status events carry an event name implying a lifecycle status
//! 2. The implied status is correlated against the stored record
//! 3. The ordering policy absorbs duplicate and reordered delivery
//! 4. Recording-ready events attach the recording URL, at most once
//!
//! The carrier delivers at-least-once with no ordering guarantee, so every
//! path in here must be a safe no-op when it has nothing new to say.

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::identity::Identity;
use crate::store::{
    Applied, CallDirection, CallEvent, CallStatus, CallStore, RecordSeed, RecordingAttach,
    SharedCallStore,
};
use crate::telemetry::counters;

/// A carrier call-status webhook, as delivered.
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub correlation_id: String,
    /// Raw carrier event name, e.g. `ringing`, `answered`, `no-answer`
    pub call_status: String,
    pub duration_secs: Option<u32>,
    /// Client address or phone number the leg originates from
    pub from: String,
    /// Client address or phone number the leg targets
    pub to: String,
}

/// A carrier recording-status webhook, as delivered.
#[derive(Debug, Clone)]
pub struct RecordingEvent {
    pub correlation_id: String,
    pub recording_url: String,
    /// Carrier recording state; only `completed` recordings are attached
    pub recording_status: String,
}

/// Outcome of reconciling a status event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// The record advanced
    Applied,
    /// Duplicate, out-of-order, or unrecognized event; absorbed silently
    Ignored,
}

/// Map a carrier status name to the lifecycle status it implies.
///
/// Unknown names return `None` and are acknowledged without effect, so new
/// carrier-side event types never cause retry storms.
pub fn implied_status(call_status: &str) -> Option<CallStatus> {
    match call_status {
        "queued" | "initiated" => Some(CallStatus::Initiated),
        "ringing" => Some(CallStatus::Ringing),
        "answered" | "in-progress" => Some(CallStatus::InProgress),
        "completed" => Some(CallStatus::Completed),
        "busy" | "no-answer" | "failed" | "canceled" => Some(CallStatus::Failed),
        _ => None,
    }
}

/// Applies carrier webhooks to the call record store.
pub struct Reconciler {
    store: SharedCallStore,
    /// Presented from-number for browser-originated legs
    shared_number: String,
}

impl Reconciler {
    pub fn new(store: SharedCallStore, shared_number: impl Into<String>) -> Self {
        Self {
            store,
            shared_number: shared_number.into(),
        }
    }

    /// Reconcile a status event.
    ///
    /// Creates the record on first sight of an unseen correlation id;
    /// carrier events are authoritative and are always absorbed. Only a
    /// storage failure propagates, so the carrier redelivers.
    pub fn handle_status(&self, event: &StatusEvent) -> Result<StatusOutcome> {
        let Some(status) = implied_status(&event.call_status) else {
            warn!(
                correlation_id = %event.correlation_id,
                call_status = %event.call_status,
                "unrecognized carrier status, ignoring"
            );
            counters::status_event("unknown");
            return Ok(StatusOutcome::Ignored);
        };

        // A client-address origin identifies the owning actor; the number
        // actually presented on such legs is the shared carrier number.
        let owner = Identity::from_client_address(&event.from);
        let from_number = match owner {
            Some(_) => self.shared_number.clone(),
            None => event.from.clone(),
        };
        let direction = match owner {
            Some(_) => CallDirection::Outbound,
            None => CallDirection::Inbound,
        };

        let seed = RecordSeed {
            direction,
            from_number,
            to_number: event.to.clone(),
            owner,
            contact_id: None,
        };

        let call_event = CallEvent::new(status, event.duration_secs);
        let (record, applied) = self
            .store
            .apply_event(&event.correlation_id, call_event, &seed)?;

        match applied {
            Applied::Transitioned { from, to } => {
                info!(
                    correlation_id = %event.correlation_id,
                    from = from.name(),
                    to = to.name(),
                    duration = ?record.duration_secs,
                    "call status advanced"
                );
                counters::status_event("applied");
                Ok(StatusOutcome::Applied)
            }
            Applied::Ignored => {
                debug!(
                    correlation_id = %event.correlation_id,
                    status = record.status.name(),
                    event = status.name(),
                    "stale or duplicate status event absorbed"
                );
                counters::status_event("ignored");
                Ok(StatusOutcome::Ignored)
            }
        }
    }

    /// Reconcile a recording-ready event.
    ///
    /// Only completed recordings are attached, only to existing records,
    /// and only once; everything else is logged and acknowledged.
    pub fn handle_recording(&self, event: &RecordingEvent) -> Result<()> {
        if event.recording_status != "completed" {
            debug!(
                correlation_id = %event.correlation_id,
                recording_status = %event.recording_status,
                "recording not complete, ignoring"
            );
            return Ok(());
        }

        match self
            .store
            .attach_recording(&event.correlation_id, &event.recording_url)?
        {
            RecordingAttach::Attached => {
                info!(
                    correlation_id = %event.correlation_id,
                    "recording attached"
                );
                counters::recording_attached();
            }
            RecordingAttach::AlreadySet => {
                debug!(
                    correlation_id = %event.correlation_id,
                    "recording already attached, ignoring"
                );
            }
            RecordingAttach::NotFound => {
                // The recording callback can race ahead of record creation;
                // the carrier redelivers, so no record is fabricated here.
                warn!(
                    correlation_id = %event.correlation_id,
                    "recording event for unknown call"
                );
                counters::recording_orphaned();
            }
        }

        Ok(())
    }
}
