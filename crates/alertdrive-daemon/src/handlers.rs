//! HTTP request handlers.
//!
//! Implements the four API operations: zone classification, alert write,
//! alert query, and status. Input validation happens here at the
//! boundary; a rejected request leaves no partial side effects.

use alertdrive_core::classifier::zone_message;
use alertdrive_core::geo::Coordinate;
use alertdrive_core::zone::Severity;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::state::SharedState;

/// Body of `POST /api/check-location`.
#[derive(Debug, Deserialize)]
pub struct CheckLocationRequest {
    lat: Option<f64>,
    lng: Option<f64>,
}

/// Response of `POST /api/check-location`.
#[derive(Debug, Serialize)]
pub struct CheckLocationResponse {
    zone: &'static str,
    message: &'static str,
}

/// Body of `POST /api/alerts`.
#[derive(Debug, Deserialize)]
pub struct LogAlertRequest {
    lat: Option<f64>,
    lng: Option<f64>,
    #[serde(rename = "zoneType")]
    zone_type: Option<String>,
}

/// Query string of `GET /api/alerts/all`.
#[derive(Debug, Deserialize)]
pub struct AlertRangeQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn client_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "Internal server error".to_string(),
        }),
    )
        .into_response()
}

/// `POST /api/check-location` - classify a coordinate sample.
pub async fn check_location(
    State(state): State<SharedState>,
    Json(body): Json<CheckLocationRequest>,
) -> Response {
    let (Some(lat), Some(lng)) = (body.lat, body.lng) else {
        return client_error("lat and lng are required");
    };

    let point = Coordinate::new(lat, lng);
    if !point.is_valid() {
        return client_error(format!("coordinate ({lat}, {lng}) is out of range"));
    }

    let verdict = state.classifier().classify(&point);
    debug!(lat, lng, zone = verdict.as_str(), "classified sample");

    Json(CheckLocationResponse {
        zone: verdict.as_str(),
        message: zone_message(verdict),
    })
    .into_response()
}

/// `POST /api/alerts` - append a zone-entry event to the audit log.
pub async fn log_alert(
    State(state): State<SharedState>,
    Json(body): Json<LogAlertRequest>,
) -> Response {
    let (Some(lat), Some(lng), Some(zone_type)) = (body.lat, body.lng, body.zone_type) else {
        return client_error("lat, lng, and zoneType are required");
    };

    let Some(severity) = Severity::parse(&zone_type) else {
        return client_error(format!("zoneType must be 'Red' or 'Yellow', got '{zone_type}'"));
    };

    let point = Coordinate::new(lat, lng);
    if !point.is_valid() {
        return client_error(format!("coordinate ({lat}, {lng}) is out of range"));
    }

    match state.audit().append(&point, severity) {
        Ok(alert) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "message": "Alert logged successfully",
                "alert": alert,
            })),
        )
            .into_response(),
        Err(e) => {
            error!("failed to log alert: {e}");
            server_error()
        },
    }
}

/// `GET /api/alerts/all` - alerts within a calendar-date range.
pub async fn get_alerts(
    State(state): State<SharedState>,
    Query(query): Query<AlertRangeQuery>,
) -> Response {
    let (Some(start), Some(end)) = (query.start_date, query.end_date) else {
        return client_error("Start date and end date are required");
    };

    let (Ok(start), Ok(end)) = (start.parse::<NaiveDate>(), end.parse::<NaiveDate>()) else {
        return client_error("dates must be in YYYY-MM-DD format");
    };

    match state.audit().query_range(start, end) {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            error!("failed to fetch alerts: {e}");
            server_error()
        },
    }
}

/// `GET /api/status` - liveness check.
pub async fn status() -> Response {
    Json(serde_json::json!({ "status": "OK" })).into_response()
}
