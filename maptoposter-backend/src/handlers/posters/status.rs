use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::Json;
use serde_json::Value;

use crate::handlers::utils::{job_id_from_path, job_to_payload};
use crate::{error::ApiError, state::AppState};

/// GET /job/{jobId}
pub async fn get_status(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let job_id = job_id_from_path(&path)?;
    let record = state
        .jobs
        .get(&job_id)
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(job_to_payload(&record)))
}
