use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::DeviceState;

/// GET /health, liveness check with a short schedule summary.
pub async fn health_handler(State(state): State<Arc<DeviceState>>) -> Json<Value> {
    let engine = state.engine();
    let snapshot = engine.snapshot();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "target": engine.target().map(|m| m.to_string()),
        "daily_enabled": snapshot.daily.enabled,
        "weekly": snapshot.weekly.len(),
        "onetime": snapshot.onetime.len(),
    }))
}
