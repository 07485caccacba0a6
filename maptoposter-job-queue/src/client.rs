//! Job queue client: accepts jobs and drives them to a terminal state.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::JobQueueError;
use crate::pipeline::RenderPipeline;
use crate::progress::ProgressReporter;
use crate::registry::JobRegistry;
use crate::types::{JobCounts, JobRecord};

const STARTING_MESSAGE: &str = "Starting poster generation";
const COMPLETED_MESSAGE: &str = "Poster generated successfully";

/// Interface for submitting jobs and observing their state.
///
/// Every submitted job runs as its own tokio task, which hands the pipeline
/// call to the blocking pool. Nothing serializes unrelated jobs; the registry
/// is the only shared state.
#[derive(Clone)]
pub struct JobQueueClient {
    registry: JobRegistry,
    pipeline: Arc<dyn RenderPipeline>,
}

impl fmt::Debug for JobQueueClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueueClient")
            .field("registry", &self.registry)
            .field("pipeline", &"<dyn RenderPipeline>")
            .finish()
    }
}

impl JobQueueClient {
    pub fn new(pipeline: Arc<dyn RenderPipeline>) -> Self {
        Self::with_registry(JobRegistry::new(), pipeline)
    }

    pub fn with_registry(registry: JobRegistry, pipeline: Arc<dyn RenderPipeline>) -> Self {
        Self { registry, pipeline }
    }

    /// Record a new queued job and start it in the background.
    ///
    /// Returns the queued snapshot immediately; the caller never waits on the
    /// job itself. Must be called from within a tokio runtime.
    pub fn submit(&self, request: Value) -> JobRecord {
        let record = self.registry.create(request.clone());
        let job_id = record.id;
        tracing::info!(%job_id, "job queued");

        let task = run_job(
            self.registry.clone(),
            Arc::clone(&self.pipeline),
            job_id,
            request,
        );
        tokio::spawn(task.instrument(tracing::info_span!("job", %job_id)));

        record
    }

    /// Get a snapshot of a job.
    pub fn get(&self, id: &Uuid) -> Option<JobRecord> {
        self.registry.get(id)
    }

    pub fn counts(&self) -> JobCounts {
        self.registry.counts()
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }
}

/// Drive one job from queued to completed or failed.
async fn run_job(
    registry: JobRegistry,
    pipeline: Arc<dyn RenderPipeline>,
    job_id: Uuid,
    request: Value,
) {
    if let Err(e) = registry.update(&job_id, |r| r.start(STARTING_MESSAGE)) {
        tracing::error!(%e, "could not start job");
        return;
    }
    tracing::info!("job processing");

    let progress = ProgressReporter::new(registry.clone(), job_id);
    let outcome =
        tokio::task::spawn_blocking(move || pipeline.render(&request, &progress)).await;

    let result = match outcome {
        Ok(Ok(path)) => finish(&registry, job_id, path).await,
        Ok(Err(e)) => {
            tracing::warn!(%e, "job failed");
            let cause = match e {
                JobQueueError::ExecutionFailed(cause) => cause,
                other => other.to_string(),
            };
            registry.update(&job_id, |r| r.fail(cause))
        }
        Err(join_error) => {
            let cause = if join_error.is_panic() {
                "render task panicked".to_string()
            } else {
                format!("render task aborted: {join_error}")
            };
            tracing::error!(%cause, "job failed");
            registry.update(&job_id, |r| r.fail(cause))
        }
    };

    if let Err(e) = result {
        tracing::error!(%e, "could not record job outcome");
    }
}

/// Complete a job only if its artifact is actually on disk.
async fn finish(
    registry: &JobRegistry,
    job_id: Uuid,
    path: PathBuf,
) -> Result<JobRecord, JobQueueError> {
    let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
    if !exists {
        tracing::warn!(path = %path.display(), "pipeline returned a missing artifact");
        return registry.update(&job_id, |r| r.fail("artifact missing after render"));
    }

    tracing::info!(path = %path.display(), "job completed");
    registry.update(&job_id, |r| r.complete(path, COMPLETED_MESSAGE))
}
