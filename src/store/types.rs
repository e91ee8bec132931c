//! Types for the call record store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Call leg direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    /// PSTN caller into the platform
    Inbound,
    /// Actor-placed call out to the PSTN or another client
    Outbound,
}

impl CallDirection {
    /// Get the string name of this direction.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

/// Call lifecycle status.
///
/// Statuses are totally ordered for reconciliation: a carrier event only
/// advances a record, never regresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    /// Call created locally or first seen via webhook
    Initiated,
    /// Carrier reports the destination is ringing
    Ringing,
    /// Call answered and connected
    InProgress,
    /// Call ended normally
    Completed,
    /// Busy, no answer, canceled, or carrier error
    Failed,
}

impl CallStatus {
    /// Position in the lifecycle order. Both terminal states share the top
    /// rank, so neither can displace the other.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Initiated => 0,
            Self::Ringing => 1,
            Self::InProgress => 2,
            Self::Completed | Self::Failed => 3,
        }
    }

    /// Check if no further transitions are applied from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Get the string name of this status.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Ringing => "ringing",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a status name (as used in query parameters).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "initiated" => Some(Self::Initiated),
            "ringing" => Some(Self::Ringing),
            "in-progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A carrier-reported lifecycle event, reduced to its implied status.
#[derive(Debug, Clone)]
pub struct CallEvent {
    /// Status implied by the carrier's event name
    pub status: CallStatus,
    /// Carrier-reported call duration, if any
    pub duration_secs: Option<u32>,
    /// When the event was received
    pub at: DateTime<Utc>,
}

impl CallEvent {
    /// Create an event stamped with the current time.
    pub fn new(status: CallStatus, duration_secs: Option<u32>) -> Self {
        Self {
            status,
            duration_secs,
            at: Utc::now(),
        }
    }

    /// Override the receipt timestamp.
    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }
}

/// Result of applying an event to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The record advanced to a later status
    Transitioned { from: CallStatus, to: CallStatus },
    /// Duplicate or out-of-order event; the status did not move
    Ignored,
}

impl Applied {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }
}

/// One call attempt.
///
/// Keyed by the carrier-assigned correlation id; mutated only through
/// [`CallRecord::apply`] and the recording attachment path, so every status
/// side effect lives in one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    /// Carrier-assigned unique id for this call attempt
    pub correlation_id: String,
    /// Leg direction
    pub direction: CallDirection,
    /// Presented caller number
    pub from_number: String,
    /// Dialed number
    pub to_number: String,
    /// Current lifecycle status
    pub status: CallStatus,
    /// Owning actor; exactly one operator or sales rep once known
    pub owner: Option<Identity>,
    /// Weak CRM contact reference matched by caller number
    pub contact_id: Option<u32>,
    /// When the call was answered
    pub started_at: Option<DateTime<Utc>>,
    /// When the call ended
    pub ended_at: Option<DateTime<Utc>>,
    /// Carrier-reported or derived duration
    pub duration_secs: Option<u32>,
    /// Recording URL, attached at most once after answer
    pub recording_url: Option<String>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record was last changed
    pub updated_at: DateTime<Utc>,
}

impl CallRecord {
    /// Create a new record in `initiated` state.
    pub fn new(
        correlation_id: impl Into<String>,
        direction: CallDirection,
        from_number: impl Into<String>,
        to_number: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            correlation_id: correlation_id.into(),
            direction,
            from_number: from_number.into(),
            to_number: to_number.into(),
            status: CallStatus::Initiated,
            owner: None,
            contact_id: None,
            started_at: None,
            ended_at: None,
            duration_secs: None,
            recording_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the owning actor.
    pub fn with_owner(mut self, owner: Identity) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Set the matched CRM contact.
    pub fn with_contact(mut self, contact_id: Option<u32>) -> Self {
        self.contact_id = contact_id;
        self
    }

    /// Apply a carrier lifecycle event.
    ///
    /// The status only moves to a strictly later rank; earlier-or-equal
    /// events leave it untouched, which makes application idempotent under
    /// duplicate and reordered delivery. Timestamp evidence is absorbed
    /// even from events that lose the status race, so a late `in-progress`
    /// still fills `started_at` on an already-completed record.
    pub fn apply(&mut self, event: &CallEvent) -> Applied {
        let mut changed = false;

        if event.status == CallStatus::InProgress && self.started_at.is_none() {
            self.started_at = Some(event.at);
            changed = true;
        }
        if event.status.is_terminal() && self.ended_at.is_none() {
            self.ended_at = Some(event.at);
            changed = true;
        }
        if self.duration_secs.is_none() {
            if let Some(duration) = self.resolve_duration(event) {
                self.duration_secs = Some(duration);
                changed = true;
            }
        }

        let applied = if !self.status.is_terminal() && event.status.rank() > self.status.rank() {
            let from = self.status;
            self.status = event.status;
            changed = true;
            Applied::Transitioned {
                from,
                to: event.status,
            }
        } else {
            Applied::Ignored
        };

        if changed {
            self.updated_at = event.at;
        }

        applied
    }

    /// Canonical duration rule: carrier-reported wins, else derive from the
    /// answer/end timestamps once both are known.
    fn resolve_duration(&self, event: &CallEvent) -> Option<u32> {
        if let Some(reported) = event.duration_secs {
            return Some(reported);
        }
        match (self.started_at, self.ended_at) {
            (Some(started), Some(ended)) => {
                Some((ended - started).num_seconds().max(0) as u32)
            }
            _ => None,
        }
    }
}

/// Query filter for call records.
///
/// Results are always newest-first.
#[derive(Debug, Clone, Default)]
pub struct CallQuery {
    /// Filter by owning actor
    pub owner: Option<Identity>,
    /// Filter by status
    pub status: Option<CallStatus>,
    /// Filter by direction
    pub direction: Option<CallDirection>,
    /// Only calls created at or after this time
    pub after: Option<DateTime<Utc>>,
    /// Only calls created before this time
    pub before: Option<DateTime<Utc>>,
    /// Substring match over from/to numbers
    pub search: Option<String>,
    /// Maximum number of results
    pub limit: Option<usize>,
    /// Results to skip (pagination)
    pub offset: Option<usize>,
}

impl CallQuery {
    /// Create a new query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by owner.
    pub fn with_owner(mut self, owner: Identity) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Filter by status.
    pub fn with_status(mut self, status: CallStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by direction.
    pub fn with_direction(mut self, direction: CallDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Only calls created at or after this time.
    pub fn with_after(mut self, after: DateTime<Utc>) -> Self {
        self.after = Some(after);
        self
    }

    /// Only calls created before this time.
    pub fn with_before(mut self, before: DateTime<Utc>) -> Self {
        self.before = Some(before);
        self
    }

    /// Substring match over from/to numbers.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Check whether a record matches this filter.
    pub fn matches(&self, record: &CallRecord) -> bool {
        if let Some(owner) = &self.owner {
            if record.owner.as_ref() != Some(owner) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(direction) = self.direction {
            if record.direction != direction {
                return false;
            }
        }
        if let Some(after) = self.after {
            if record.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.before {
            if record.created_at >= before {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !record.from_number.contains(search.as_str())
                && !record.to_number.contains(search.as_str())
            {
                return false;
            }
        }
        true
    }
}

/// Aggregate call statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallStats {
    /// Total records
    pub total: u64,
    /// Records in `initiated`
    pub initiated: u64,
    /// Records in `ringing`
    pub ringing: u64,
    /// Records in `in-progress`
    pub in_progress: u64,
    /// Records in `completed`
    pub completed: u64,
    /// Records in `failed`
    pub failed: u64,
    /// Share of calls that completed, 0-100
    pub completion_rate: f64,
    /// Mean duration over completed calls that have one
    pub average_duration_secs: f64,
}
