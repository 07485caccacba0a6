use std::sync::Arc;

use maptoposter_artifacts::{ArtifactStore, CleanupTrigger};
use maptoposter_job_queue::JobQueueClient;
use maptoposter_render::ThemeProvider;

/// Shared application state passed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub jobs: JobQueueClient,
    pub store: ArtifactStore,
    pub themes: Arc<dyn ThemeProvider>,
    /// Asks the cleanup scheduler for an early sweep.
    pub cleanup: CleanupTrigger,
}

impl AppState {
    pub fn new(
        jobs: JobQueueClient,
        store: ArtifactStore,
        themes: Arc<dyn ThemeProvider>,
        cleanup: CleanupTrigger,
    ) -> Self {
        Self {
            jobs,
            store,
            themes,
            cleanup,
        }
    }
}
