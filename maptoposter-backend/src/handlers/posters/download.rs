use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Extension, Path, Query};
use axum::http::{header, HeaderValue};
use axum::response::Response;
use maptoposter_job_queue::JobStatus;
use maptoposter_render::download_file_name;
use tokio_util::io::ReaderStream;

use crate::handlers::utils::{job_id_from_path, parse_bool_param};
use crate::{error::ApiError, state::AppState};

/// GET /download/{jobId}?download=bool
/// Stream a finished poster. `download=false` asks the browser to show it inline.
pub async fn download(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<HashMap<String, String>>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Response, ApiError> {
    let job_id = job_id_from_path(&path)?;
    let params = query.ok().map(|value| value.0).unwrap_or_default();
    let as_attachment = parse_bool_param(params.get("download"), true, "download")?;

    let record = state
        .jobs
        .get(&job_id)
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if record.status != JobStatus::Completed {
        return Err(ApiError::precondition("Poster not ready yet"));
    }
    let artifact = record
        .artifact_path
        .as_deref()
        .ok_or_else(|| ApiError::not_found("Poster file not found"))?;

    let file_path = state.store.resolve(artifact).map_err(|e| {
        tracing::debug!(%job_id, error = %e, "artifact unavailable");
        ApiError::not_found("Poster file not found")
    })?;

    // The sweeper may remove the file between resolve and open.
    let file = match tokio::fs::File::open(&file_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("Poster file not found"));
        }
        Err(e) => return Err(ApiError::Unexpected(e.to_string())),
    };

    // Header values must be visible ASCII; slugs may keep other letters.
    let file_name: String = download_file_name(&record.request)
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    let disposition = format!(
        "{}; filename=\"{file_name}\"",
        if as_attachment { "attachment" } else { "inline" },
    );
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| ApiError::Unexpected(e.to_string()))?;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    tracing::info!(%job_id, path = %file_path.display(), "serving poster");
    state.cleanup.request();

    Ok(response)
}
