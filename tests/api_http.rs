// tests/api_http.rs
//
// HTTP-level tests for the diagnostics Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tokio::sync::mpsc;
use tower::ServiceExt as _; // for `oneshot`

use common::{Script, ScriptedAdapter};
use goodscoop::api::{self, ApiState};
use goodscoop::scheduler::Scheduler;
use goodscoop::{AdapterRegistry, ContentCategory};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router() -> Router {
    let (tx, _rx) = mpsc::unbounded_channel();
    let scheduler = Arc::new(Scheduler::new(tx));
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    scheduler.install(77, "Quinn", 8, 5, now);

    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(ScriptedAdapter::new(
        "weather",
        ContentCategory::Weather,
        Script::Items(vec![]),
    )
    .unavailable()));
    registry.register(Arc::new(ScriptedAdapter::new(
        "tech_news",
        ContentCategory::Tech,
        Script::Items(vec![]),
    )));
    registry.apply_disabled(&["tech_news".to_string()]);

    api::router(ApiState {
        scheduler,
        registry: Arc::new(registry),
    })
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let (status, bytes) = get(test_router(), "/health").await;
    assert_eq!(status, StatusCode::OK, "health should be 200");
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "OK");
}

#[tokio::test]
async fn debug_jobs_lists_installed_triggers() {
    let (status, bytes) = get(test_router(), "/debug/jobs").await;
    assert_eq!(status, StatusCode::OK);

    let v: Json = serde_json::from_slice(&bytes).expect("parse jobs json");
    let jobs = v.as_array().expect("array");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["subscriber_id"], 77);
    assert_eq!(jobs[0]["trigger_hour_utc"], 8);
    assert_eq!(jobs[0]["trigger_minute_utc"], 5);
}

#[tokio::test]
async fn debug_sources_reports_enabled_and_available() {
    let (status, bytes) = get(test_router(), "/debug/sources").await;
    assert_eq!(status, StatusCode::OK);

    let v: Json = serde_json::from_slice(&bytes).expect("parse sources json");
    let sources = v.as_array().expect("array");
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["name"], "weather");
    assert_eq!(sources[0]["enabled"], true);
    assert_eq!(sources[0]["available"], false);
    assert_eq!(sources[1]["name"], "tech_news");
    assert_eq!(sources[1]["enabled"], false);
    assert_eq!(sources[1]["category"], "tech");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (status, _) = get(test_router(), "/analyze").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
