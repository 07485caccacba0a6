//! Boundary trait for the long-running render work a job performs.

use std::path::PathBuf;

use serde_json::Value;

use crate::error::JobQueueError;
use crate::progress::ProgressReporter;

/// A blocking operation that turns a request snapshot into an artifact file.
///
/// Implementations run on the blocking thread pool and may take minutes. They
/// call `progress.report` as they move through their stages, and must only
/// return a path once the file at that path is completely written.
///
/// Any error is final for the job; retries of network work belong inside the
/// implementation.
pub trait RenderPipeline: Send + Sync {
    fn render(&self, request: &Value, progress: &ProgressReporter)
        -> Result<PathBuf, JobQueueError>;
}

impl<F> RenderPipeline for F
where
    F: Fn(&Value, &ProgressReporter) -> Result<PathBuf, JobQueueError> + Send + Sync,
{
    fn render(
        &self,
        request: &Value,
        progress: &ProgressReporter,
    ) -> Result<PathBuf, JobQueueError> {
        self(request, progress)
    }
}
