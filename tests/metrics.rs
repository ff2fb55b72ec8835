// tests/metrics.rs
//
// One test per binary: the Prometheus recorder is process-global.

mod common;

use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::{item, Script, ScriptedAdapter};
use goodscoop::metrics::Metrics;
use goodscoop::{AdapterRegistry, Aggregator, ContentCategory};

#[tokio::test]
async fn metrics_endpoint_contains_expected_series() {
    let metrics = Metrics::init().expect("recorder installs once");

    let mut reg = AdapterRegistry::new();
    reg.register(Arc::new(ScriptedAdapter::new(
        "weather",
        ContentCategory::Weather,
        Script::Items(vec![item("Clear, 4C", ContentCategory::Weather, "OpenWeatherMap")]),
    )));
    reg.register(Arc::new(ScriptedAdapter::new(
        "broken",
        ContentCategory::Tech,
        Script::Fail("dns"),
    )));
    let agg = Aggregator::new(Arc::new(reg));
    agg.fetch_all_at(7200).await;
    agg.fetch_all_at(7201).await;

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "ingest_items_total",
        "ingest_adapter_errors_total",
        "ingest_cache_hits_total",
        "ingest_cache_misses_total",
        "scheduler_jobs",
    ] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }
}
