//! End-to-end tests over the HTTP surface.
//!
//! Drives the real server with a mock carrier: placement, voice/status/
//! recording webhooks, queries, and token issuance.
//!
//! Run with: cargo test --test webhook_api

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use callbridge::bootstrap::{EngineState, SharedEngineState, Shutdown};
use callbridge::config::Config;
use callbridge::http::ApiServer;
use callbridge::identity::{ActorKind, Identity};
use callbridge::store::{CallDirection, CallStatus, CallStore};

/// Port allocator for tests
static PORT: AtomicU16 = AtomicU16::new(19300);

fn next_port() -> u16 {
    PORT.fetch_add(1, Ordering::SeqCst)
}

const SHARED_NUMBER: &str = "+15550009999";
const OPERATOR_NUMBER: &str = "+15550001111";
const CONTACT_NUMBER: &str = "+15557654321";

fn base_yaml() -> String {
    r#"
carrier:
  account_sid: "AC0000"
  auth_token: "token"
  api_key: "SK0000"
  api_secret: "secret-material"
  app_sid: "AP0000"
  shared_number: "+15550009999"
  webhook_base_url: "https://calls.example.com"
  mock: true

directory:
  operators:
    - id: 7
      name: Dispatch Desk
      phone_number: "+15550001111"
  sales_reps:
    - id: 42
      name: Ada
  contacts:
    - id: 3
      name: Acme Trucking
      phone_number: "+15557654321"
"#
    .to_string()
}

/// Config without token-signing credentials
fn unconfigured_yaml() -> String {
    r#"
carrier:
  shared_number: "+15550009999"
  webhook_base_url: "https://calls.example.com"
  mock: true

directory:
  sales_reps:
    - id: 42
      name: Ada
"#
    .to_string()
}

#[derive(Debug, Deserialize)]
struct PlaceCallResponse {
    correlation_id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    identity: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Test fixture that starts the server on a unique port
struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    state: SharedEngineState,
    base_url: String,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(base_yaml()).await
    }

    async fn start_with(yaml: String) -> Self {
        let port = next_port();
        let mut config = Config::from_yaml(&yaml).expect("valid test config");
        config.http.address = format!("127.0.0.1:{}", port).parse().unwrap();
        let config = Arc::new(config);

        let state = EngineState::new(config.clone()).expect("engine state");
        let shutdown = Shutdown::new();
        let api = ApiServer::new(&config.http, state.clone(), shutdown);

        let handle = tokio::spawn(async move {
            let _ = api.run().await;
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        Self {
            handle,
            state,
            base_url: format!("http://127.0.0.1:{}", port),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn post_status(
    client: &reqwest::Client,
    server: &TestServer,
    sid: &str,
    status: &str,
    duration: Option<&str>,
    from: &str,
    to: &str,
) -> reqwest::Response {
    let mut form = vec![
        ("CallSid", sid),
        ("CallStatus", status),
        ("From", from),
        ("To", to),
    ];
    if let Some(duration) = duration {
        form.push(("CallDuration", duration));
    }

    client
        .post(server.url("/webhooks/status"))
        .form(&form)
        .send()
        .await
        .expect("status webhook request")
}

#[tokio::test]
async fn test_outbound_placement_creates_initiated_record() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/calls"))
        .json(&serde_json::json!({
            "kind": "sales",
            "id": 42,
            "to_number": "+15551234567",
            "record": true
        }))
        .send()
        .await
        .expect("placement request");

    assert_eq!(resp.status(), StatusCode::OK);
    let placed: PlaceCallResponse = resp.json().await.unwrap();
    assert_eq!(placed.status, "initiated");

    let record = server
        .state
        .store
        .get(&placed.correlation_id)
        .unwrap()
        .expect("record created synchronously");
    assert_eq!(record.direction, CallDirection::Outbound);
    assert_eq!(record.status, CallStatus::Initiated);
    assert_eq!(record.owner, Some(Identity::new(ActorKind::SalesRep, 42)));
    assert_eq!(record.to_number, "+15551234567");
    // Rep 42 has no assigned number, so the shared caller-ID is presented
    assert_eq!(record.from_number, SHARED_NUMBER);
}

#[tokio::test]
async fn test_placement_rejects_bad_destination() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/calls"))
        .json(&serde_json::json!({
            "kind": "sales",
            "id": 42,
            "to_number": "not a number"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(server.url("/calls"))
        .json(&serde_json::json!({
            "kind": "sales",
            "id": 999,
            "to_number": "+15551234567"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_events_in_order() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let from = "client:sales-42";
    let to = "+15551234567";
    for (status, duration) in [
        ("ringing", None),
        ("in-progress", None),
        ("completed", Some("130")),
    ] {
        let resp = post_status(&client, &server, "CA200", status, duration, from, to).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let record = server.state.store.get("CA200").unwrap().unwrap();
    assert_eq!(record.status, CallStatus::Completed);
    assert_eq!(record.duration_secs, Some(130));
    assert!(record.started_at.is_some());
    assert!(record.ended_at.is_some());
    assert_eq!(record.owner, Some(Identity::new(ActorKind::SalesRep, 42)));
}

#[tokio::test]
async fn test_status_events_out_of_order() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let from = "client:sales-42";
    let to = "+15551234567";
    // in-progress first; the late ringing must not regress the record
    for (status, duration) in [
        ("in-progress", None),
        ("ringing", None),
        ("completed", Some("130")),
    ] {
        let resp = post_status(&client, &server, "CA201", status, duration, from, to).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let record = server.state.store.get("CA201").unwrap().unwrap();
    assert_eq!(record.status, CallStatus::Completed);
    assert_eq!(record.duration_secs, Some(130));
    assert!(record.started_at.is_some());
    assert!(record.ended_at.is_some());
}

#[tokio::test]
async fn test_duplicate_status_event_is_absorbed() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let from = "client:sales-42";
    let to = "+15551234567";
    post_status(&client, &server, "CA202", "completed", Some("60"), from, to).await;
    let snapshot = server.state.store.get("CA202").unwrap().unwrap();

    let resp = post_status(&client, &server, "CA202", "completed", Some("60"), from, to).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let record = server.state.store.get("CA202").unwrap().unwrap();
    assert_eq!(record.status, snapshot.status);
    assert_eq!(record.duration_secs, snapshot.duration_secs);
    assert_eq!(record.updated_at, snapshot.updated_at);
}

#[tokio::test]
async fn test_inbound_voice_routes_to_operator() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/webhooks/voice"))
        .form(&[
            ("CallSid", "CA300"),
            ("From", "+15559998888"),
            ("To", OPERATOR_NUMBER),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let xml = resp.text().await.unwrap();
    assert!(xml.contains("<Client>operator-7</Client>"), "xml: {xml}");
    assert!(xml.contains(r#"callerId="+15559998888""#));
    assert!(xml.contains(r#"record="record-from-answer""#));

    let record = server.state.store.get("CA300").unwrap().unwrap();
    assert_eq!(record.direction, CallDirection::Inbound);
    assert_eq!(record.owner, Some(Identity::new(ActorKind::Operator, 7)));
    assert_eq!(record.contact_id, None);

    // The follow-up status event updates the same record without
    // disturbing ownership
    post_status(
        &client,
        &server,
        "CA300",
        "ringing",
        None,
        "+15559998888",
        OPERATOR_NUMBER,
    )
    .await;
    let record = server.state.store.get("CA300").unwrap().unwrap();
    assert_eq!(record.status, CallStatus::Ringing);
    assert_eq!(record.owner, Some(Identity::new(ActorKind::Operator, 7)));
}

#[tokio::test]
async fn test_inbound_voice_attaches_known_contact() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    client
        .post(server.url("/webhooks/voice"))
        .form(&[
            ("CallSid", "CA301"),
            ("From", CONTACT_NUMBER),
            ("To", OPERATOR_NUMBER),
        ])
        .send()
        .await
        .unwrap();

    let record = server.state.store.get("CA301").unwrap().unwrap();
    assert_eq!(record.contact_id, Some(3));
}

#[tokio::test]
async fn test_inbound_to_unassigned_number_is_rejected() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/webhooks/voice"))
        .form(&[
            ("CallSid", "CA302"),
            ("From", "+15559998888"),
            ("To", "+15553334444"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let xml = resp.text().await.unwrap();
    assert!(xml.contains("<Say>"));
    assert!(xml.contains("<Hangup/>"));
    assert!(!xml.contains("<Dial"));

    // No record is required for a rejected leg
    assert!(server.state.store.get("CA302").unwrap().is_none());

    // If the carrier still reports status for it, a bare ownerless record
    // is created rather than erroring
    let resp = post_status(
        &client,
        &server,
        "CA302",
        "completed",
        None,
        "+15559998888",
        "+15553334444",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let record = server.state.store.get("CA302").unwrap().unwrap();
    assert_eq!(record.owner, None);
    assert_eq!(record.status, CallStatus::Completed);
}

#[tokio::test]
async fn test_recording_webhook_sets_url_once() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    post_status(
        &client,
        &server,
        "CA400",
        "in-progress",
        None,
        "client:operator-7",
        "+15551234567",
    )
    .await;

    for url in ["https://r.example.com/rec-1", "https://r.example.com/rec-2"] {
        let resp = client
            .post(server.url("/webhooks/recording"))
            .form(&[
                ("CallSid", "CA400"),
                ("RecordingUrl", url),
                ("RecordingStatus", "completed"),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let record = server.state.store.get("CA400").unwrap().unwrap();
    assert_eq!(
        record.recording_url.as_deref(),
        Some("https://r.example.com/rec-1")
    );
}

#[tokio::test]
async fn test_recording_for_unknown_call_is_acknowledged() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/webhooks/recording"))
        .form(&[
            ("CallSid", "CA404"),
            ("RecordingUrl", "https://r.example.com/rec"),
            ("RecordingStatus", "completed"),
        ])
        .send()
        .await
        .unwrap();

    // Acknowledged so the carrier does not retry indefinitely
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_token_scoped_to_requesting_actor() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(server.url("/token?kind=sales&id=42"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let token: TokenResponse = resp.json().await.unwrap();
    assert_eq!(token.identity, "sales-42");
    assert!(!token.token.is_empty());
    assert!(token.expires_in > 0);

    let resp = client
        .get(server.url("/token?kind=sales&id=999"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_token_unavailable_without_credentials() {
    let server = TestServer::start_with(unconfigured_yaml()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(server.url("/token?kind=sales&id=42"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = resp.json().await.unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("temporarily unavailable"));
    // The missing key name is an ops detail, not an actor-facing one
    assert!(!message.contains("api_secret"));
}

#[tokio::test]
async fn test_recent_calls_newest_first() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    for sid in ["CA500", "CA501", "CA502"] {
        post_status(
            &client,
            &server,
            sid,
            "completed",
            Some("10"),
            "client:sales-42",
            "+15551234567",
        )
        .await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let resp = client
        .get(server.url("/calls/recent?kind=sales&id=42&limit=2"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let calls: Vec<serde_json::Value> = resp.json().await.unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0]["correlation_id"], "CA502");
    assert_eq!(calls[1]["correlation_id"], "CA501");
}

#[tokio::test]
async fn test_call_query_filters() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    post_status(
        &client,
        &server,
        "CA600",
        "completed",
        Some("10"),
        "client:sales-42",
        "+15551234567",
    )
    .await;
    post_status(
        &client,
        &server,
        "CA601",
        "no-answer",
        None,
        "client:sales-42",
        "+15557770000",
    )
    .await;

    let resp = client
        .get(server.url("/calls?kind=sales&id=42&status=failed"))
        .send()
        .await
        .unwrap();
    let calls: Vec<serde_json::Value> = resp.json().await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["correlation_id"], "CA601");

    let resp = client
        .get(server.url("/calls?q=123"))
        .send()
        .await
        .unwrap();
    let calls: Vec<serde_json::Value> = resp.json().await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["correlation_id"], "CA600");

    let resp = client
        .get(server.url("/calls?status=bogus"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_call_metrics() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    post_status(
        &client,
        &server,
        "CA700",
        "completed",
        Some("100"),
        "client:operator-7",
        "+15551234567",
    )
    .await;
    post_status(
        &client,
        &server,
        "CA701",
        "busy",
        None,
        "client:operator-7",
        "+15551234567",
    )
    .await;

    let resp = client
        .get(server.url("/calls/metrics?kind=operator&id=7"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let metrics: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(metrics["total"], 2);
    assert_eq!(metrics["completed"], 1);
    assert_eq!(metrics["failed"], 1);
    assert_eq!(metrics["average_duration_secs"], 100.0);
}

#[tokio::test]
async fn test_end_call_reaches_carrier() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client
        .delete(server.url("/calls/CA800"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_and_readiness() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client.get(server.url("/healthz")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = resp.json().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert!(!health.version.is_empty());

    let resp = client.get(server.url("/livez")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client.get(server.url("/readyz")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client.get(server.url("/metrics")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client.get(server.url("/stats")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
