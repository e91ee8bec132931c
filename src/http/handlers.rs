//! HTTP handlers.
//!
//! Two audiences with different contracts:
//! - Carrier webhooks (form-encoded): answer fast, absorb duplicates, and
//!   only report failure when storage is down so the carrier redelivers.
//! - Actor-facing API (JSON): explicit success or failure per request;
//!   never blocks waiting for a call to connect.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};

use prometheus::{Encoder, TextEncoder};
use tracing::error;

use crate::bootstrap::SharedEngineState;
use crate::carrier::CreateCall;
use crate::directory::ActorDirectory;
use crate::error::{Error, Result};
use crate::identity::{ActorKind, Identity};
use crate::reconcile::{RecordingEvent, StatusEvent};
use crate::routing::{normalize_number, DialTarget};
use crate::store::{CallDirection, CallQuery, CallRecord, CallStats, CallStatus, CallStore};
use crate::telemetry::counters;
use crate::twiml::{ControlDocument, RecordingPolicy};

// =============================================================================
// Carrier webhooks
// =============================================================================

/// Voice webhook payload (control-document request).
#[derive(Debug, Deserialize)]
pub struct VoiceWebhook {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "To", default)]
    pub to: String,
    #[serde(rename = "Record", default)]
    pub record: Option<String>,
}

/// Record flag passed through the voice URL query string for REST-placed
/// calls.
#[derive(Debug, Deserialize)]
pub struct VoiceQuery {
    #[serde(rename = "Record", default)]
    pub record: Option<String>,
}

/// Voice webhook: return the control document for a leg.
///
/// A `client:` origin marks a browser-placed outbound leg; anything else is
/// an inbound PSTN call to be routed by its dialed number.
pub async fn voice_handler(
    State(state): State<SharedEngineState>,
    Query(query): Query<VoiceQuery>,
    Form(form): Form<VoiceWebhook>,
) -> Response {
    let record_requested = flag(query.record.as_deref()) || flag(form.record.as_deref());

    let document = match Identity::from_client_address(&form.from) {
        Some(identity) => outbound_leg(&state, &form, identity, record_requested),
        None => inbound_leg(&state, &form),
    };

    match document {
        Ok(document) => match document.to_xml() {
            Ok(xml) => ([(header::CONTENT_TYPE, "text/xml")], xml).into_response(),
            Err(e) => {
                error!(call_sid = %form.call_sid, error = %e, "control document render failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Err(e) => {
            error!(call_sid = %form.call_sid, error = %e, "voice webhook failed");
            e.status_code().into_response()
        }
    }
}

fn flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Browser-placed outbound leg: dial the destination with the originating
/// actor's caller-ID and write the initial call record.
fn outbound_leg(
    state: &SharedEngineState,
    form: &VoiceWebhook,
    identity: Identity,
    record_requested: bool,
) -> Result<ControlDocument> {
    if form.to.trim().is_empty() {
        return Ok(ControlDocument::reject());
    }

    let target = state.routing.resolve_outbound(&form.to);
    let caller_id = state.caller_id.resolve(&identity);

    let to_number = match &target {
        DialTarget::Client(destination) => destination.client_address(),
        DialTarget::Number(number) => number.clone(),
    };
    state.store.upsert_initial(
        CallRecord::new(&form.call_sid, CallDirection::Outbound, &caller_id, to_number)
            .with_owner(identity),
    )?;

    let recording = if record_requested {
        RecordingPolicy::FromAnswer {
            callback_url: state.webhook_url("/webhooks/recording"),
        }
    } else {
        RecordingPolicy::Disabled
    };

    Ok(ControlDocument::dial(target, caller_id, recording))
}

/// Inbound PSTN leg: route by the dialed number, attach any matching CRM
/// contact, and ring the owning actor's registered endpoint.
fn inbound_leg(state: &SharedEngineState, form: &VoiceWebhook) -> Result<ControlDocument> {
    let Some(actor) = state.routing.resolve_inbound(&form.to) else {
        counters::routing_unresolved();
        return Ok(ControlDocument::reject());
    };

    let identity = actor.identity();
    let contact_id = state.routing.lookup_contact(&form.from);

    state.store.upsert_initial(
        CallRecord::new(&form.call_sid, CallDirection::Inbound, &form.from, &form.to)
            .with_owner(identity)
            .with_contact(contact_id),
    )?;

    Ok(ControlDocument::connect_client(
        identity,
        &form.from,
        state.config.engine.dial_timeout.as_secs(),
        RecordingPolicy::FromAnswer {
            callback_url: state.webhook_url("/webhooks/recording"),
        },
    ))
}

/// Status webhook payload.
#[derive(Debug, Deserialize)]
pub struct StatusWebhook {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "CallStatus")]
    pub call_status: String,
    #[serde(rename = "CallDuration", default)]
    pub call_duration: Option<String>,
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "To", default)]
    pub to: String,
}

/// Status webhook: reconcile a lifecycle event.
///
/// Always acknowledges, including for duplicate, reordered, and
/// unrecognized events; only storage failure returns 5xx so the carrier
/// retries.
pub async fn status_handler(
    State(state): State<SharedEngineState>,
    Form(form): Form<StatusWebhook>,
) -> Response {
    let event = StatusEvent {
        correlation_id: form.call_sid.clone(),
        call_status: form.call_status.clone(),
        duration_secs: form.call_duration.as_deref().and_then(|d| d.parse().ok()),
        from: form.from,
        to: form.to,
    };

    match state.reconciler.handle_status(&event) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => {
            error!(call_sid = %form.call_sid, error = %e, "status webhook failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Recording status webhook payload.
#[derive(Debug, Deserialize)]
pub struct RecordingWebhook {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "RecordingUrl", default)]
    pub recording_url: String,
    #[serde(rename = "RecordingStatus", default = "default_recording_status")]
    pub recording_status: String,
}

fn default_recording_status() -> String {
    "completed".to_string()
}

/// Recording webhook: attach a completed recording, at most once.
pub async fn recording_handler(
    State(state): State<SharedEngineState>,
    Form(form): Form<RecordingWebhook>,
) -> Response {
    let event = RecordingEvent {
        correlation_id: form.call_sid.clone(),
        recording_url: form.recording_url,
        recording_status: form.recording_status,
    };

    match state.reconciler.handle_recording(&event) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            error!(call_sid = %form.call_sid, error = %e, "recording webhook failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// =============================================================================
// Actor-facing API
// =============================================================================

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiError {
            error: message.into(),
        }),
    )
        .into_response()
}

fn engine_error(e: &Error) -> Response {
    api_error(e.status_code(), e.user_message())
}

/// Actor selector used by token, recent-calls, and metrics requests.
#[derive(Debug, Deserialize)]
pub struct ActorQuery {
    pub kind: String,
    pub id: u32,
}

/// Resolve and validate an actor selector against the directory.
fn resolve_actor(
    state: &SharedEngineState,
    kind: &str,
    id: u32,
) -> std::result::Result<Identity, Response> {
    let Some(kind) = ActorKind::from_tag(kind) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("unknown actor kind: {kind}"),
        ));
    };
    if state.actors.lookup(kind, id).is_none() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("unknown {}: {id}", kind.tag()),
        ));
    }
    Ok(Identity::new(kind, id))
}

/// Token response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub identity: String,
    pub expires_in: u64,
}

/// GET /token - issue a voice credential for the requesting actor.
pub async fn token_handler(
    State(state): State<SharedEngineState>,
    Query(query): Query<ActorQuery>,
) -> Response {
    let identity = match resolve_actor(&state, &query.kind, query.id) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    match state.tokens.issue(&identity) {
        Ok(issued) => Json(TokenResponse {
            token: issued.token,
            identity: issued.identity,
            expires_in: issued.expires_in,
        })
        .into_response(),
        Err(e) => {
            error!(identity = %identity, error = %e, "token issuance failed");
            engine_error(&e)
        }
    }
}

/// Call placement request.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaceCallRequest {
    pub kind: String,
    pub id: u32,
    pub to_number: String,
    #[serde(default)]
    pub record: bool,
}

/// Call placement response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaceCallResponse {
    pub correlation_id: String,
    pub status: String,
}

/// POST /calls - place an outbound call for an actor.
///
/// Returns the correlation id promptly or an explicit failure; never waits
/// for the call to connect. On carrier timeout no record is created; a
/// late status webhook for a call that did go through is absorbed as a
/// fresh record by the reconciler.
pub async fn place_call_handler(
    State(state): State<SharedEngineState>,
    Json(request): Json<PlaceCallRequest>,
) -> Response {
    let identity = match resolve_actor(&state, &request.kind, request.id) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let Some(to_number) = normalize_number(&request.to_number) else {
        return api_error(
            StatusCode::BAD_REQUEST,
            format!("not a phone number: {}", request.to_number),
        );
    };

    let from_number = state.caller_id.resolve(&identity);
    let voice_url = format!(
        "{}?Record={}",
        state.webhook_url("/webhooks/voice"),
        request.record
    );

    let create = CreateCall {
        to: to_number.clone(),
        from: from_number.clone(),
        voice_url,
        status_callback: state.webhook_url("/webhooks/status"),
    };

    let correlation_id = match state.carrier.create_call(&create).await {
        Ok(sid) => sid,
        Err(e) => {
            error!(identity = %identity, error = %e, "call placement failed");
            counters::call_placement_failed();
            return engine_error(&e);
        }
    };

    let record = CallRecord::new(
        &correlation_id,
        CallDirection::Outbound,
        from_number,
        to_number,
    )
    .with_owner(identity);

    if let Err(e) = state.store.upsert_initial(record) {
        // The carrier call is in flight; its status webhooks will recreate
        // the record once storage recovers.
        error!(correlation_id = %correlation_id, error = %e, "initial record write failed");
        return engine_error(&e);
    }

    counters::call_placed();
    Json(PlaceCallResponse {
        correlation_id,
        status: CallStatus::Initiated.name().to_string(),
    })
    .into_response()
}

/// DELETE /calls/{correlation_id} - ask the carrier to end an active call.
///
/// The record is not touched here; the resulting status webhook drives it
/// to its terminal state.
pub async fn end_call_handler(
    State(state): State<SharedEngineState>,
    Path(correlation_id): Path<String>,
) -> Response {
    match state.carrier.end_call(&correlation_id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            error!(correlation_id = %correlation_id, error = %e, "call termination failed");
            engine_error(&e)
        }
    }
}

/// Recent-calls selector.
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub kind: String,
    pub id: u32,
    pub limit: Option<usize>,
}

/// GET /calls/recent - an actor's latest calls, newest first.
pub async fn recent_calls_handler(
    State(state): State<SharedEngineState>,
    Query(query): Query<RecentQuery>,
) -> Response {
    let identity = match resolve_actor(&state, &query.kind, query.id) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let limit = query
        .limit
        .unwrap_or(state.config.engine.recent_limit)
        .min(state.config.engine.max_query_limit);

    let calls = state
        .store
        .query(&CallQuery::new().with_owner(identity).with_limit(limit));

    match calls {
        Ok(calls) => Json(calls).into_response(),
        Err(e) => engine_error(&e),
    }
}

/// Call list filters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub kind: Option<String>,
    pub id: Option<u32>,
    pub status: Option<String>,
    pub direction: Option<String>,
    pub after: Option<chrono::DateTime<chrono::Utc>>,
    pub before: Option<chrono::DateTime<chrono::Utc>>,
    /// Substring match over from/to numbers
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// GET /calls - query call records.
pub async fn list_calls_handler(
    State(state): State<SharedEngineState>,
    Query(params): Query<ListQuery>,
) -> Response {
    let mut query = CallQuery::new();

    match (&params.kind, params.id) {
        (Some(kind), Some(id)) => match resolve_actor(&state, kind, id) {
            Ok(identity) => query.owner = Some(identity),
            Err(response) => return response,
        },
        (None, None) => {}
        _ => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "kind and id must be provided together",
            );
        }
    }

    if let Some(status) = params.status.as_deref() {
        match CallStatus::from_name(status) {
            Some(status) => query.status = Some(status),
            None => {
                return api_error(StatusCode::BAD_REQUEST, format!("unknown status: {status}"));
            }
        }
    }

    if let Some(direction) = params.direction.as_deref() {
        match direction {
            "inbound" => query.direction = Some(CallDirection::Inbound),
            "outbound" => query.direction = Some(CallDirection::Outbound),
            other => {
                return api_error(
                    StatusCode::BAD_REQUEST,
                    format!("unknown direction: {other}"),
                );
            }
        }
    }

    query.after = params.after;
    query.before = params.before;
    query.search = params.q;
    query.offset = params.offset;
    query.limit = Some(
        params
            .limit
            .unwrap_or(state.config.engine.max_query_limit)
            .min(state.config.engine.max_query_limit),
    );

    match state.store.query(&query) {
        Ok(calls) => Json(calls).into_response(),
        Err(e) => engine_error(&e),
    }
}

/// GET /calls/metrics - aggregate call statistics for one actor.
pub async fn call_metrics_handler(
    State(state): State<SharedEngineState>,
    Query(query): Query<ActorQuery>,
) -> Response {
    let identity = match resolve_actor(&state, &query.kind, query.id) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    match state.store.stats(Some(&identity)) {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => engine_error(&e),
    }
}

// =============================================================================
// Operational endpoints
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check handler.
pub async fn health_handler(State(state): State<SharedEngineState>) -> impl IntoResponse {
    let healthy = state.is_healthy();
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    if healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Live handler (for Kubernetes).
pub async fn live_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Ready handler (for Kubernetes).
pub async fn ready_handler(State(state): State<SharedEngineState>) -> impl IntoResponse {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Stats response.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub uptime_seconds: u64,
    pub calls: CallStats,
}

/// Stats handler.
pub async fn stats_handler(State(state): State<SharedEngineState>) -> Response {
    match state.store.stats(None) {
        Ok(calls) => Json(StatsResponse {
            uptime_seconds: state.uptime().as_secs(),
            calls,
        })
        .into_response(),
        Err(e) => engine_error(&e),
    }
}

/// Metrics handler (Prometheus format).
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let output = String::from_utf8(buffer).unwrap_or_default();
            (
                StatusCode::OK,
                [("content-type", "text/plain; charset=utf-8")],
                output,
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Error encoding metrics: {}", e),
        ),
    }
}
