//! Integration tests for fcr-client
//!
//! These tests serve a fake telemetry backend with axum and drive it through
//! the client, so the client stays in sync with the backend routes.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use fcr_client::testing::TestServer;
use fcr_client::FcrClientError;
use fcr_core::{BackendError, ServerEvent, ServerStatus, TelemetryBackend};
use futures::stream::{self, Stream, StreamExt};
use serde_json::{json, Value};

// =============================================================================
// Fake Backend
// =============================================================================

/// Requests seen by the fake backend, as "METHOD path body"
#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

async fn connect(State(rec): State<Recorder>, Json(body): Json<Value>) -> Json<Value> {
    rec.record(format!("POST /rosco/connect {}", body));
    Json(json!({"Initialised": true, "ECUID": "3a001402"}))
}

async fn disconnect(State(rec): State<Recorder>) -> Json<Value> {
    rec.record("POST /rosco/disconnect");
    Json(json!({}))
}

async fn heartbeat(State(rec): State<Recorder>) -> Json<Value> {
    rec.record("POST /rosco/heartbeat");
    Json(json!({}))
}

async fn dataframe(State(rec): State<Recorder>) -> Json<Value> {
    rec.record("GET /rosco/dataframe");
    Json(json!({
        "Time": "10:00:01",
        "EngineRPM": 912,
        "IACPosition": 0,
        "IdleError": 65,
        "IdleSwitch": false,
        "ClosedLoop": true,
        "LambdaVoltage": 5,
        "LambdaStatus": 1,
        "DTC0": 1,
        "CoolantTempSensorFault": true
    }))
}

async fn adjust(
    State(rec): State<Recorder>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.record(format!("POST /rosco/adjust/{} {}", id, body));
    let steps = body["Steps"].as_i64().unwrap_or(0);
    Json(json!({"adjustment": id, "value": 30 + steps}))
}

async fn actuate(
    State(rec): State<Recorder>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.record(format!("POST /rosco/test/{} {}", id, body));
    Json(json!({"actuator": id, "activate": body["Activate"]}))
}

async fn scenarios() -> Json<Value> {
    Json(json!([{"name": "idle-hunt.fcr"}, {"name": "cold-start.fcr"}]))
}

async fn scenario(Path(name): Path<String>) -> (StatusCode, Json<Value>) {
    if name == "missing.fcr" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "scenario not found"})),
        );
    }
    (StatusCode::OK, Json(json!({"Count": 240, "Position": 1})))
}

async fn ports() -> Json<Value> {
    Json(json!({"ports": ["/dev/ttyUSB0", "/dev/ttyUSB1"]}))
}

async fn server_events(
    State(rec): State<Recorder>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    rec.record("GET /heartbeat");
    Sse::new(stream::iter([
        Ok(Event::default().event("heartbeat").data("1")),
        Ok(Event::default()
            .event("status")
            .data(r#"{"Connected":true,"ECUID":"3a001402"}"#)),
    ]))
}

fn fake_backend(rec: Recorder) -> Router {
    Router::new()
        .route("/rosco/connect", post(connect))
        .route("/rosco/disconnect", post(disconnect))
        .route("/rosco/heartbeat", post(heartbeat))
        .route("/rosco/dataframe", get(dataframe))
        .route("/rosco/adjust/{id}", post(adjust))
        .route("/rosco/test/{id}", post(actuate))
        .route("/scenario", get(scenarios))
        .route("/scenario/{name}", get(scenario))
        .route("/config/ports", get(ports))
        .route("/heartbeat", get(server_events))
        .with_state(rec)
}

async fn start() -> (TestServer, Recorder) {
    let rec = Recorder::default();
    let server = TestServer::start(fake_backend(rec.clone()))
        .await
        .expect("test server");
    (server, rec)
}

// =============================================================================
// Connection
// =============================================================================

#[tokio::test]
async fn test_connect_sends_port() {
    let (server, rec) = start().await;

    let resp = server.client.connect("COM3").await.unwrap();
    assert!(resp.initialised);
    assert_eq!(resp.ecu_id.as_deref(), Some("3a001402"));
    assert_eq!(rec.calls(), vec![r#"POST /rosco/connect {"port":"COM3"}"#]);
}

#[tokio::test]
async fn test_disconnect_and_heartbeat() {
    let (server, rec) = start().await;

    server.client.heartbeat().await.unwrap();
    server.client.disconnect().await.unwrap();
    assert_eq!(
        rec.calls(),
        vec!["POST /rosco/heartbeat", "POST /rosco/disconnect"]
    );
}

// =============================================================================
// Dataframes and Commands
// =============================================================================

#[tokio::test]
async fn test_dataframe_decodes_sample() {
    let (server, _rec) = start().await;

    let sample = server.client.dataframe().await.unwrap();
    assert_eq!(sample.engine_rpm, Some(912.0));
    assert_eq!(sample.iac_position, Some(0.0));
    assert!(sample.closed_loop);
    assert!(sample.coolant_temp_sensor_fault);
    assert_eq!(sample.dtc0, Some(1));
}

#[tokio::test]
async fn test_adjust_returns_confirmed_value() {
    let (server, rec) = start().await;

    let resp = server.client.adjust("iac", -1).await.unwrap();
    assert_eq!(resp.adjustment, "iac");
    assert_eq!(resp.value, 29.0);
    assert_eq!(rec.calls(), vec![r#"POST /rosco/adjust/iac {"Steps":-1}"#]);
}

#[tokio::test]
async fn test_actuate() {
    let (server, rec) = start().await;

    let resp = server.client.actuate("fuelpump", true).await.unwrap();
    assert_eq!(resp.actuator, "fuelpump");
    assert!(resp.activate);
    assert_eq!(
        rec.calls(),
        vec![r#"POST /rosco/test/fuelpump {"Activate":true}"#]
    );
}

// =============================================================================
// Scenarios and Ports
// =============================================================================

#[tokio::test]
async fn test_scenarios() {
    let (server, _rec) = start().await;

    let list = server.client.list_scenarios().await.unwrap();
    let names: Vec<&str> = list.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["idle-hunt.fcr", "cold-start.fcr"]);

    let desc = server.client.load_scenario("idle-hunt.fcr").await.unwrap();
    assert_eq!(desc.count, 240);
    assert_eq!(desc.position, 1);
}

#[tokio::test]
async fn test_missing_scenario_is_server_error() {
    let (server, _rec) = start().await;

    let err = server.client.load_scenario("missing.fcr").await.unwrap_err();
    match err {
        FcrClientError::ServerError { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "scenario not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_ports() {
    let (server, _rec) = start().await;

    let ports = server.client.list_ports().await.unwrap();
    assert_eq!(ports.ports.len(), 2);
}

// =============================================================================
// TelemetryBackend implementation
// =============================================================================

#[tokio::test]
async fn test_backend_trait_object() {
    let (server, rec) = start().await;
    let backend: Arc<dyn TelemetryBackend> = Arc::new(server.client.clone());

    let resp = backend.connect("COM3").await.unwrap();
    assert!(resp.initialised);
    let sample = backend.fetch_dataframe().await.unwrap();
    assert_eq!(sample.lambda_voltage, Some(5.0));
    let adj = backend.send_adjustment("idlespeed", 2).await.unwrap();
    assert_eq!(adj.value, 32.0);

    let err = backend.load_scenario("missing.fcr").await.unwrap_err();
    assert!(matches!(err, BackendError::Server { status: 404, .. }));
    assert_eq!(rec.calls().len(), 3);
}

#[tokio::test]
async fn test_unreachable_backend_is_connection_error() {
    let (server, _rec) = start().await;
    let base = server.base_url();
    server.shutdown().await;

    let client = fcr_client::FcrClient::new(&base).unwrap();
    let backend: &dyn TelemetryBackend = &client;
    let err = backend.heartbeat().await.unwrap_err();
    assert!(err.is_transient(), "unexpected error: {err}");
}

// =============================================================================
// Server events
// =============================================================================

#[tokio::test]
async fn test_server_events_stream() {
    let (server, rec) = start().await;

    let mut events = server.client.subscribe_events().await.unwrap();
    let mut seen = Vec::new();
    while let Some(event) = events.next().await {
        seen.push(event.unwrap());
    }

    assert_eq!(
        seen,
        vec![
            ServerEvent::Heartbeat,
            ServerEvent::Status(ServerStatus {
                connected: Some(true),
                ecu_id: Some("3a001402".into()),
                ..Default::default()
            }),
        ]
    );
    assert_eq!(rec.calls(), vec!["GET /heartbeat"]);
}

#[tokio::test]
async fn test_server_events_through_backend_trait() {
    let (server, _rec) = start().await;
    let backend: Arc<dyn TelemetryBackend> = Arc::new(server.client.clone());

    let events: Vec<_> = backend.subscribe_events().await.unwrap().collect().await;
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Ok(ServerEvent::Heartbeat)));
}

#[tokio::test]
async fn test_server_events_missing_route() {
    let router = Router::new().route("/config/ports", get(ports));
    let server = TestServer::start(router).await.unwrap();

    let err = server.client.subscribe_events().await.err().unwrap();
    assert!(matches!(err, FcrClientError::ServerError { status: 404, .. }));

    let backend: &dyn TelemetryBackend = &server.client;
    let err = backend.subscribe_events().await.err().unwrap();
    assert!(matches!(err, BackendError::NotSupported(_)));
}
