//! Error types for the job queue system.

use thiserror::Error;
use uuid::Uuid;

use crate::types::JobStatus;

/// Errors that may occur while interacting with the job queue.
#[derive(Debug, Error)]
pub enum JobQueueError {
    #[error("job not found: {0}")]
    NotFound(Uuid),

    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("completed job {0} must carry an artifact path")]
    MissingArtifact(Uuid),

    #[error("job execution failed: {0}")]
    ExecutionFailed(String),
}
