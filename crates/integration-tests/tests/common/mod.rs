//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use cs_core::{ApprovalState, ContentItem, EventRecord, RawStageSettings, SubmissionRecord};
use cs_rotation::Placement;

pub fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_225_600, 0).unwrap()
}

pub fn image(id: &str, secs: i64) -> ContentItem {
    ContentItem::image(id, format!("https://cdn.example/{id}.jpg"), epoch() + Duration::seconds(secs))
}

pub fn text(id: &str, secs: i64) -> ContentItem {
    ContentItem::text(id, format!("hello from {id}"), epoch() + Duration::seconds(secs))
}

pub fn record(id: &str, media_type: &str, secs: i64) -> SubmissionRecord {
    SubmissionRecord {
        id: id.into(),
        event_id: "gala".into(),
        media_type: media_type.into(),
        image: Some(format!("https://cdn.example/{id}.jpg")),
        text: Some(format!("hello from {id}")),
        sender: Some("guest".into()),
        status: ApprovalState::Approved,
        timestamp: epoch() + Duration::seconds(secs),
    }
}

pub fn event(id: &str, settings: serde_json::Value) -> EventRecord {
    EventRecord {
        id: id.into(),
        name: format!("Event {id}"),
        disabled: false,
        settings: serde_json::from_value::<RawStageSettings>(settings).unwrap(),
        background_image: None,
    }
}

pub fn slot_ids(slots: &[Option<Placement>]) -> Vec<Option<String>> {
    slots
        .iter()
        .map(|s| s.as_ref().map(|p| p.item.id.clone()))
        .collect()
}

pub fn ids(expected: &[Option<&str>]) -> Vec<Option<String>> {
    expected.iter().map(|s| s.map(str::to_owned)).collect()
}

/// Sends one request through the router and returns status and body.
/// Empty bodies are `Null`; non-JSON bodies come back as a string.
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (axum::http::StatusCode, serde_json::Value) {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}
