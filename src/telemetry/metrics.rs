//! Prometheus metrics.
//!
//! All counters register against the default registry and are exported by
//! the `/metrics` endpoint.

/// Process-wide call-engine counters.
pub mod counters {
    use prometheus::{
        register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec,
    };
    use std::sync::OnceLock;

    fn calls_placed_total() -> &'static IntCounter {
        static METRIC: OnceLock<IntCounter> = OnceLock::new();
        METRIC.get_or_init(|| {
            register_int_counter!(
                "callbridge_calls_placed_total",
                "Outbound calls accepted by the carrier"
            )
            .expect("metric registered once")
        })
    }

    fn call_placement_failures_total() -> &'static IntCounter {
        static METRIC: OnceLock<IntCounter> = OnceLock::new();
        METRIC.get_or_init(|| {
            register_int_counter!(
                "callbridge_call_placement_failures_total",
                "Outbound call placements that failed at the carrier"
            )
            .expect("metric registered once")
        })
    }

    fn status_events_total() -> &'static IntCounterVec {
        static METRIC: OnceLock<IntCounterVec> = OnceLock::new();
        METRIC.get_or_init(|| {
            register_int_counter_vec!(
                "callbridge_status_events_total",
                "Carrier status events by reconciliation result",
                &["result"]
            )
            .expect("metric registered once")
        })
    }

    fn recordings_attached_total() -> &'static IntCounter {
        static METRIC: OnceLock<IntCounter> = OnceLock::new();
        METRIC.get_or_init(|| {
            register_int_counter!(
                "callbridge_recordings_attached_total",
                "Recordings attached to call records"
            )
            .expect("metric registered once")
        })
    }

    fn recordings_orphaned_total() -> &'static IntCounter {
        static METRIC: OnceLock<IntCounter> = OnceLock::new();
        METRIC.get_or_init(|| {
            register_int_counter!(
                "callbridge_recordings_orphaned_total",
                "Recording events that matched no call record"
            )
            .expect("metric registered once")
        })
    }

    fn routing_unresolved_total() -> &'static IntCounter {
        static METRIC: OnceLock<IntCounter> = OnceLock::new();
        METRIC.get_or_init(|| {
            register_int_counter!(
                "callbridge_routing_unresolved_total",
                "Inbound calls whose dialed number matched no actor"
            )
            .expect("metric registered once")
        })
    }

    fn tokens_issued_total() -> &'static IntCounter {
        static METRIC: OnceLock<IntCounter> = OnceLock::new();
        METRIC.get_or_init(|| {
            register_int_counter!(
                "callbridge_tokens_issued_total",
                "Voice access tokens issued"
            )
            .expect("metric registered once")
        })
    }

    /// An outbound call was accepted by the carrier.
    pub fn call_placed() {
        calls_placed_total().inc();
    }

    /// An outbound call placement failed.
    pub fn call_placement_failed() {
        call_placement_failures_total().inc();
    }

    /// A status event was reconciled; result is `applied`, `ignored`, or
    /// `unknown`.
    pub fn status_event(result: &str) {
        status_events_total().with_label_values(&[result]).inc();
    }

    /// A recording URL was attached.
    pub fn recording_attached() {
        recordings_attached_total().inc();
    }

    /// A recording event arrived for an unknown call.
    pub fn recording_orphaned() {
        recordings_orphaned_total().inc();
    }

    /// An inbound call could not be routed.
    pub fn routing_unresolved() {
        routing_unresolved_total().inc();
    }

    /// A voice token was issued.
    pub fn token_issued() {
        tokens_issued_total().inc();
    }
}
