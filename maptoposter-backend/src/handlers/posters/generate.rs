use std::sync::Arc;

use axum::extract::Extension;
use axum::Json;
use maptoposter_render::PosterRequest;
use serde_json::Value;

use crate::handlers::utils::job_to_payload;
use crate::validation::{to_payload, validate_poster_request, ValidationIssue};
use crate::{error::ApiError, state::AppState};

/// POST /generate
/// Validate a poster request and queue a job for it.
pub async fn generate(
    Extension(state): Extension<Arc<AppState>>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.ok_or_else(|| ApiError::bad_request("request body is required"))?;

    let request: PosterRequest = serde_json::from_value(body).map_err(|e| {
        ApiError::Validation(to_payload(&[ValidationIssue::new(
            "body",
            "invalid",
            e.to_string(),
        )]))
    })?;

    // Theme lookup reads the themes directory.
    let themes = Arc::clone(&state.themes);
    let (request, issues) = tokio::task::spawn_blocking(move || {
        let issues = validate_poster_request(&request, themes.as_ref());
        (request, issues)
    })
    .await
    .map_err(|e| ApiError::Unexpected(e.to_string()))?;

    if !issues.is_empty() {
        return Err(ApiError::Validation(to_payload(&issues)));
    }

    let snapshot = serde_json::to_value(&request)?;
    let record = state.jobs.submit(snapshot);
    tracing::info!(
        job_id = %record.id,
        city = %request.city,
        theme = %request.theme,
        "poster job accepted"
    );

    Ok(Json(job_to_payload(&record)))
}
