//! Health endpoints

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use super::AppContext;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub streaming: bool,
    pub detector_mode: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// `GET /health`
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthReport> {
    let now = Utc::now();
    Json(HealthReport {
        status: "healthy",
        uptime_seconds: (now - ctx.started_at).num_seconds().max(0) as u64,
        streaming: ctx.manager.is_streaming(),
        detector_mode: if ctx.detector.is_model_loaded() {
            "model"
        } else {
            "mock"
        },
        timestamp: now,
    })
}

pub async fn ready() -> Json<Value> {
    Json(json!({ "status": "ready" }))
}

pub async fn live() -> Json<Value> {
    Json(json!({ "status": "alive" }))
}
