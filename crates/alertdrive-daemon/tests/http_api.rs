//! HTTP API contract tests.
//!
//! Drives the router directly with `tower::ServiceExt::oneshot`, no
//! socket needed. Covers the wire contracts: classification responses,
//! audit write/read status codes and messages, the end-widening query
//! rule, and boundary validation.

use std::io::Write;
use std::sync::Arc;

use alertdrive_core::audit::AuditLog;
use alertdrive_core::geo::Coordinate;
use alertdrive_core::zone::{SpatialIndex, parse_region_set, Severity};
use alertdrive_daemon::server::router;
use alertdrive_daemon::state::{AppStateHandle, SharedState};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Utc};
use tower::ServiceExt;

const ZONES: &str = r#"{
    "red_zones": [
        { "name": "red-square", "vertices": [[0.0, 0.0], [0.0, 2.0], [2.0, 2.0], [2.0, 0.0]] }
    ],
    "yellow_zones": [
        { "name": "yellow-square", "vertices": [[10.0, 10.0], [10.0, 12.0], [12.0, 12.0], [12.0, 10.0]] }
    ]
}"#;

fn make_state() -> SharedState {
    let index = SpatialIndex::new(parse_region_set(ZONES).unwrap());
    let audit = AuditLog::in_memory().unwrap();
    Arc::new(AppStateHandle::new(
        Arc::new(index),
        audit,
        "zones.json".into(),
    ))
}

fn make_app() -> (Router, SharedState) {
    let state = make_state();
    (router(Arc::clone(&state)), state)
}

async fn send_json(
    app: Router,
    method: &str,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn send_get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn check_location_red_zone() {
    let (app, _) = make_app();
    let (status, body) = send_json(
        app,
        "POST",
        "/api/check-location",
        serde_json::json!({ "lat": 1.0, "lng": 1.0 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["zone"], "Red");
    assert_eq!(body["message"], "You are in a high accident-prone area!");
}

#[tokio::test]
async fn check_location_yellow_and_none() {
    let (app, _) = make_app();

    let (status, body) = send_json(
        app.clone(),
        "POST",
        "/api/check-location",
        serde_json::json!({ "lat": 11.0, "lng": 11.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["zone"], "Yellow");
    assert_eq!(
        body["message"],
        "Caution: You are in a moderate accident-prone area."
    );

    let (status, body) = send_json(
        app,
        "POST",
        "/api/check-location",
        serde_json::json!({ "lat": 5.0, "lng": 5.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["zone"], "None");
    assert_eq!(body["message"], "You are in a safe zone.");
}

#[tokio::test]
async fn check_location_missing_field_is_client_error() {
    let (app, _) = make_app();
    let (status, body) = send_json(
        app,
        "POST",
        "/api/check-location",
        serde_json::json!({ "lat": 1.0 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "lat and lng are required");
}

#[tokio::test]
async fn check_location_out_of_range_is_client_error() {
    let (app, _) = make_app();
    let (status, _) = send_json(
        app,
        "POST",
        "/api/check-location",
        serde_json::json!({ "lat": 95.0, "lng": 0.0 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn log_alert_created_with_server_timestamp() {
    let (app, state) = make_app();
    let before = Utc::now();

    let (status, body) = send_json(
        app,
        "POST",
        "/api/alerts",
        serde_json::json!({ "lat": 1.0, "lng": 1.5, "zoneType": "Red" }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Alert logged successfully");
    assert_eq!(body["alert"]["zoneType"], "Red");
    assert_eq!(body["alert"]["lat"], 1.0);

    let ts: DateTime<Utc> = body["alert"]["timestamp"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(ts >= before - chrono::Duration::seconds(1));

    assert_eq!(state.audit().len().unwrap(), 1);
}

#[tokio::test]
async fn log_alert_missing_field_writes_nothing() {
    let (app, state) = make_app();

    let (status, body) = send_json(
        app,
        "POST",
        "/api/alerts",
        serde_json::json!({ "lat": 1.0, "lng": 1.5 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "lat, lng, and zoneType are required");
    assert!(state.audit().is_empty().unwrap());
}

#[tokio::test]
async fn log_alert_rejects_unknown_zone_type() {
    let (app, state) = make_app();

    let (status, _) = send_json(
        app,
        "POST",
        "/api/alerts",
        serde_json::json!({ "lat": 1.0, "lng": 1.5, "zoneType": "Purple" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(state.audit().is_empty().unwrap());
}

#[tokio::test]
async fn get_alerts_requires_both_dates() {
    let (app, _) = make_app();

    let (status, body) = send_get(app.clone(), "/api/alerts/all?start_date=2024-01-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Start date and end date are required");

    let (status, _) = send_get(app, "/api/alerts/all").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_alerts_rejects_malformed_dates() {
    let (app, _) = make_app();
    let (status, _) = send_get(
        app,
        "/api/alerts/all?start_date=yesterday&end_date=2024-01-01",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_alerts_applies_end_widening() {
    let (app, state) = make_app();
    let point = Coordinate::new(1.0, 1.0);

    let ts = |s: &str| s.parse::<DateTime<Utc>>().unwrap();
    state
        .audit()
        .append_at(&point, Severity::Red, ts("2024-01-01T08:00:00Z"))
        .unwrap();
    state
        .audit()
        .append_at(&point, Severity::Yellow, ts("2024-01-01T23:30:00Z"))
        .unwrap();
    state
        .audit()
        .append_at(&point, Severity::Red, ts("2024-01-02T00:00:00Z"))
        .unwrap();

    let (status, body) = send_get(
        app,
        "/api/alerts/all?start_date=2024-01-01&end_date=2024-01-01",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 2);
    // Ordered by timestamp ascending.
    assert_eq!(records[0]["zoneType"], "Red");
    assert_eq!(records[1]["zoneType"], "Yellow");
}

#[tokio::test]
async fn status_endpoint() {
    let (app, _) = make_app();
    let (status, body) = send_get(app, "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn zones_reload_swaps_without_downtime() {
    // Start with a zones file containing only the red square; the reload
    // adds a yellow square and queries see it immediately after.
    let dir = tempfile::tempdir().unwrap();
    let zones_path = dir.path().join("zones.json");
    std::fs::write(
        &zones_path,
        r#"{ "red_zones": [{ "name": "r", "vertices": [[0.0, 0.0], [0.0, 2.0], [2.0, 2.0], [2.0, 0.0]] }] }"#,
    )
    .unwrap();

    let index = Arc::new(SpatialIndex::load(&zones_path).unwrap());
    let state = Arc::new(AppStateHandle::new(
        Arc::clone(&index),
        AuditLog::in_memory().unwrap(),
        zones_path.clone(),
    ));
    let app = router(Arc::clone(&state));

    let (_, body) = send_json(
        app.clone(),
        "POST",
        "/api/check-location",
        serde_json::json!({ "lat": 11.0, "lng": 11.0 }),
    )
    .await;
    assert_eq!(body["zone"], "None");

    let mut file = std::fs::File::create(&zones_path).unwrap();
    file.write_all(ZONES.as_bytes()).unwrap();
    let count = state.reload_zones().unwrap();
    assert_eq!(count, 2);

    let (_, body) = send_json(
        app,
        "POST",
        "/api/check-location",
        serde_json::json!({ "lat": 11.0, "lng": 11.0 }),
    )
    .await;
    assert_eq!(body["zone"], "Yellow");
}
