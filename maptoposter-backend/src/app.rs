use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Extension},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::handlers::{posters, presets, system, themes};
use crate::state::AppState;

// Poster requests are small; anything near this size is not a poster request.
const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

/// Router settings that come from configuration rather than shared state.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Directory served as the fallback for non-API paths.
    pub static_dir: Option<PathBuf>,
    pub cors: CorsLayer,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            static_dir: None,
            cors: CorsLayer::permissive(),
        }
    }
}

/// Build the primary axum router with the provided shared application state.
pub fn build_router(state: Arc<AppState>) -> Router {
    build_router_with_options(state, RouterOptions::default())
}

pub fn build_router_with_options(state: Arc<AppState>, options: RouterOptions) -> Router {
    let api = Router::new()
        .route("/generate", post(posters::generate::generate))
        .route("/job/{jobId}", get(posters::status::get_status))
        .route("/download/{jobId}", get(posters::download::download))
        .route("/themes", get(themes::list_themes))
        .route("/presets", get(presets::get_presets))
        .route("/health", get(system::health))
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT));

    let mut router = Router::new().nest("/api", api);

    // A frontend with its own index page owns "/".
    let has_index = options
        .static_dir
        .as_ref()
        .is_some_and(|dir| dir.join("index.html").is_file());
    if !has_index {
        router = router.route("/", get(system::root));
    }

    if let Some(dir) = options.static_dir {
        let static_service = ServeDir::new(&dir).append_index_html_on_directories(true);
        router = router.fallback_service(static_service);
    }

    router.layer(Extension(state)).layer(options.cors)
}
