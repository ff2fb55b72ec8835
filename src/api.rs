//! HTTP surface: health plus read-only diagnostics.
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::ingest::{AdapterRegistry, AdapterStatus};
use crate::scheduler::{ScheduledJob, Scheduler};

#[derive(Clone)]
pub struct ApiState {
    pub scheduler: Arc<Scheduler>,
    pub registry: Arc<AdapterRegistry>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/debug/jobs", get(debug_jobs))
        .route("/debug/sources", get(debug_sources))
        .with_state(state)
}

async fn debug_jobs(State(state): State<ApiState>) -> Json<Vec<ScheduledJob>> {
    Json(state.scheduler.jobs())
}

async fn debug_sources(State(state): State<ApiState>) -> Json<Vec<AdapterStatus>> {
    Json(state.registry.statuses())
}
