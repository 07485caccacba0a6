use std::sync::Arc;

use axum::extract::Extension;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Map Poster Generator API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health
/// Liveness plus a count of tracked jobs per status.
pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let counts = state.jobs.counts();
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "jobs": {
            "queued": counts.queued,
            "processing": counts.processing,
            "completed": counts.completed,
            "failed": counts.failed,
            "total": counts.total(),
        },
    }))
}
