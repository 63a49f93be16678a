//! In-process router tests via `tower::ServiceExt::oneshot`; no port is bound.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use triage_core::{MemoryStore, OpsDesk, SystemClock, TriageConfig};
use triage_server::{router, AppState};

fn app() -> Router {
    let desk = OpsDesk::new(
        Arc::new(MemoryStore::new()),
        Arc::new(SystemClock),
        TriageConfig::default(),
    );
    router(AppState::new(desk))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create(app: &Router, title: &str, priority: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/incidents",
        Some(json!({
            "title": title,
            "description": "Customers report errors at checkout",
            "priority": priority,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

#[tokio::test]
async fn liveness() {
    let (status, body) = send(&app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn create_defaults_to_p2_and_records_creation() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/incidents",
        Some(json!({ "title": "Webhook retries", "description": "Partner endpoint returns 429" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["priority"], "P2");
    assert_eq!(body["status"], "open");
    assert!(body["resolved_at"].is_null());

    let id = body["id"].as_str().unwrap();
    let (status, timeline) = send(&app, "GET", &format!("/incidents/{id}/timeline"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(timeline[0]["event_type"], "created");
    assert_eq!(timeline[0]["new_value"], "P2 open");
}

#[tokio::test]
async fn create_rejects_short_title_and_bad_priority() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/incidents",
        Some(json!({ "title": "ab", "description": "Customers report errors" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, _) = send(
        &app,
        "POST",
        "/incidents",
        Some(json!({ "title": "Checkout down", "description": "Customers report errors", "priority": "P9" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_lifecycle_over_http() {
    let app = app();
    let incident = create(&app, "Checkout failing", "P1").await;
    let uri = format!("/incidents/{}", incident["id"].as_str().unwrap());

    let (status, body) = send(&app, "PATCH", &uri, Some(json!({ "status": "resolved" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "transition_error");

    let (status, _) = send(&app, "PATCH", &uri, Some(json!({ "status": "investigating" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "PATCH",
        &uri,
        Some(json!({ "status": "resolved", "resolved_by": "On-call" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "precondition_error");

    let (status, body) = send(
        &app,
        "PATCH",
        &uri,
        Some(json!({
            "status": "resolved",
            "resolved_by": "On-call",
            "resolution_notes": "Rolled back release",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "resolved");
    assert_eq!(body["resolved_by"], "On-call");
    assert_eq!(body["resolved_at"], body["updated_at"]);

    let (_, active) = send(&app, "GET", "/ops/active-incidents", None).await;
    assert_eq!(active.as_array().unwrap().len(), 0);
    let (_, resolved) = send(&app, "GET", "/incidents?status=resolved", None).await;
    assert_eq!(resolved.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_incident_is_404() {
    let app = app();
    let (status, body) = send(&app, "GET", "/incidents/missing/timeline", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = send(
        &app,
        "PATCH",
        "/incidents/missing",
        Some(json!({ "status": "investigating" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_reports_missing_incident_before_bad_values() {
    let app = app();
    let (status, body) = send(
        &app,
        "PATCH",
        "/incidents/missing",
        Some(json!({ "status": "investigating", "priority": "P9" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let id = create(&app, "Webhook retries", "P2").await["id"]
        .as_str()
        .unwrap()
        .to_string();
    let uri = format!("/incidents/{id}");
    let (status, body) = send(
        &app,
        "PATCH",
        &uri,
        Some(json!({ "status": "resolved", "resolved_by": "Intern", "resolution_notes": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "transition_error");

    let (status, body) = send(
        &app,
        "PATCH",
        &uri,
        Some(json!({ "status": "investigating", "priority": "P9" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn ops_views_on_a_fresh_desk() {
    let app = app();
    create(&app, "Checkout failing", "P0").await;

    let (status, health) = send(&app, "GET", "/ops/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["active_total"], 1);
    assert_eq!(health["score"]["status"], "green");
    assert_eq!(health["sla"]["P0"], 30);
    assert_eq!(health["aging_buckets"]["lt_15m"], 1);
    assert!(health["mttr"]["avg_minutes"].is_null());

    let (status, recs) = send(&app, "GET", "/ops/recommendations?top_n=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recs["health_status"], "green");
    assert_eq!(recs["recommendations"][0]["action_type"], "improve_closure_hygiene");
    assert_eq!(recs["recommendations"][0]["rank"], 1);

    let (_, summary) = send(&app, "GET", "/ops/recommendations/summary", None).await;
    assert_eq!(
        summary["summary"],
        "Operational health is GREEN: no key risk triggers detected."
    );

    let (status, kpis) = send(&app, "GET", "/ops/kpis?days=30", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(kpis["window_days"], 30);
    assert_eq!(kpis["resolved_count"], 0);
}

#[tokio::test]
async fn out_of_range_query_is_400() {
    let app = app();
    for uri in [
        "/ops/recommendations?top_n=11",
        "/ops/kpis?days=0",
        "/ops/active-incidents?limit=501",
        "/incidents?days=400",
        "/incidents?status=closed",
    ] {
        let (status, body) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"]["code"], "validation_error", "{uri}");
    }
}

#[tokio::test]
async fn triage_suggests_priority() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/triage",
        Some(json!({ "title": "Checkout outage", "description": "Payment failing for many customers" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggested_priority"], "P0");
    assert_eq!(body["next_steps"].as_array().unwrap().len(), 5);

    let (status, body) = send(
        &app,
        "POST",
        "/triage",
        Some(json!({ "title": "Billing portal slow", "description": "Latency over 3s in EU region" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggested_priority"], "P2");
}
