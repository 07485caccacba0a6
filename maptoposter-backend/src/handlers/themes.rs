use std::sync::Arc;

use axum::extract::Extension;
use axum::Json;
use maptoposter_render::Theme;
use serde_json::{json, Value};

use crate::{error::ApiError, state::AppState};

fn theme_to_payload(theme: &Theme) -> Value {
    json!({
        "name": theme.name,
        "displayName": theme.display_name,
        "description": theme.description,
        "colors": theme.preview_colors(),
    })
}

/// GET /themes
/// List every loadable theme with a few preview colours.
pub async fn list_themes(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let themes = Arc::clone(&state.themes);
    let listed = tokio::task::spawn_blocking(move || themes.list_themes())
        .await
        .map_err(|e| ApiError::Unexpected(e.to_string()))??;

    let items: Vec<Value> = listed.iter().map(theme_to_payload).collect();
    Ok(Json(Value::Array(items)))
}
