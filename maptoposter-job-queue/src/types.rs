//! Core types for the job queue system.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::JobQueueError;

/// Progress recorded when a job leaves the queue.
pub const START_PROGRESS: u8 = 5;

/// Highest progress a job may report before it has actually completed.
pub const MAX_RUNNING_PROGRESS: u8 = 99;

/// Status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Returns true if this status represents a terminal state.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked poster generation job.
///
/// Fields are public for reading. State changes go through [`JobRecord::start`],
/// [`JobRecord::record_progress`], [`JobRecord::complete`] and
/// [`JobRecord::fail`], which reject illegal transitions without touching the
/// record, so `artifact_path` is `Some` exactly when `status` is `Completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub status: JobStatus,
    pub message: String,
    pub progress: u8,
    /// Snapshot of the accepted request. Never modified after creation.
    pub request: Value,
    pub artifact_path: Option<PathBuf>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub const QUEUED_MESSAGE: &'static str = "Job queued for processing";

    /// Create a new queued job.
    #[inline]
    pub fn new(id: Uuid, request: Value) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Queued,
            message: Self::QUEUED_MESSAGE.to_string(),
            progress: 0,
            request,
            artifact_path: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn ensure(&self, expected: JobStatus, to: JobStatus) -> Result<(), JobQueueError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(JobQueueError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            })
        }
    }

    /// Move a queued job into processing.
    pub fn start(&mut self, message: impl Into<String>) -> Result<(), JobQueueError> {
        self.ensure(JobStatus::Queued, JobStatus::Processing)?;
        self.status = JobStatus::Processing;
        self.progress = START_PROGRESS;
        self.message = message.into();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record a progress report from a running job.
    ///
    /// The percentage is capped at `MAX_RUNNING_PROGRESS`. A report below the
    /// recorded percentage is stale and dropped whole, message included.
    /// Returns false (and changes nothing) when the report is stale or the job
    /// is not processing.
    pub fn record_progress(&mut self, percent: u8, message: impl Into<String>) -> bool {
        let percent = percent.min(MAX_RUNNING_PROGRESS);
        if self.status != JobStatus::Processing || percent < self.progress {
            return false;
        }
        self.progress = percent;
        self.message = message.into();
        self.updated_at = Utc::now();
        true
    }

    /// Replace the step description of a running job, keeping its percentage.
    pub fn set_message(&mut self, message: impl Into<String>) -> bool {
        if self.status != JobStatus::Processing {
            return false;
        }
        self.message = message.into();
        self.updated_at = Utc::now();
        true
    }

    /// Mark a processing job as completed with its artifact.
    pub fn complete(
        &mut self,
        artifact_path: PathBuf,
        message: impl Into<String>,
    ) -> Result<(), JobQueueError> {
        self.ensure(JobStatus::Processing, JobStatus::Completed)?;
        if artifact_path.as_os_str().is_empty() {
            return Err(JobQueueError::MissingArtifact(self.id));
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.message = message.into();
        self.artifact_path = Some(artifact_path);
        self.error = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mark a processing job as failed.
    pub fn fail(&mut self, cause: impl Into<String>) -> Result<(), JobQueueError> {
        self.ensure(JobStatus::Processing, JobStatus::Failed)?;
        let cause = cause.into();
        self.status = JobStatus::Failed;
        self.progress = 0;
        self.message = format!("Error: {cause}");
        self.artifact_path = None;
        self.error = Some(cause);
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Number of tracked jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl JobCounts {
    #[inline]
    pub fn total(&self) -> usize {
        self.queued + self.processing + self.completed + self.failed
    }

    pub(crate) fn add(&mut self, status: JobStatus) {
        match status {
            JobStatus::Queued => self.queued += 1,
            JobStatus::Processing => self.processing += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Failed => self.failed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn queued() -> JobRecord {
        JobRecord::new(Uuid::new_v4(), json!({"city": "Paris"}))
    }

    #[test]
    fn new_job_is_queued_at_zero() {
        let job = queued();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert_eq!(job.message, JobRecord::QUEUED_MESSAGE);
        assert!(job.artifact_path.is_none());
    }

    #[test]
    fn lifecycle_to_completed() {
        let mut job = queued();
        job.start("starting").unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, START_PROGRESS);

        assert!(job.record_progress(40, "fetching"));
        job.complete(PathBuf::from("/tmp/paris.png"), "done").unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.artifact_path.as_deref(), Some(std::path::Path::new("/tmp/paris.png")));
        assert!(job.error.is_none());
    }

    #[test]
    fn failure_resets_progress_and_clears_artifact() {
        let mut job = queued();
        job.start("starting").unwrap();
        job.record_progress(60, "rendering");
        job.fail("geocoding failed").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 0);
        assert_eq!(job.message, "Error: geocoding failed");
        assert_eq!(job.error.as_deref(), Some("geocoding failed"));
        assert!(job.artifact_path.is_none());
    }

    #[test]
    fn progress_never_regresses_and_stays_below_100() {
        let mut job = queued();
        job.start("starting").unwrap();
        assert!(job.record_progress(50, "half"));
        assert!(!job.record_progress(20, "late report"));
        assert_eq!(job.progress, 50);
        assert_eq!(job.message, "half");
        assert!(job.record_progress(50, "same step, new detail"));
        assert_eq!(job.message, "same step, new detail");
        job.record_progress(250, "overshoot");
        assert_eq!(job.progress, MAX_RUNNING_PROGRESS);
    }

    #[test]
    fn set_message_keeps_percentage() {
        let mut job = queued();
        assert!(!job.set_message("not running yet"));
        assert_eq!(job.message, JobRecord::QUEUED_MESSAGE);

        job.start("starting").unwrap();
        job.record_progress(45, "Downloading water features...");
        assert!(job.set_message("Skipped water features: timed out"));
        assert_eq!(job.progress, 45);
        assert_eq!(job.message, "Skipped water features: timed out");

        job.fail("boom").unwrap();
        assert!(!job.set_message("too late"));
        assert_eq!(job.message, "Error: boom");
    }

    #[test]
    fn cannot_skip_processing() {
        let mut job = queued();
        let err = job.complete(PathBuf::from("/tmp/x.png"), "done").unwrap_err();
        assert!(matches!(
            err,
            JobQueueError::InvalidTransition {
                from: JobStatus::Queued,
                to: JobStatus::Completed,
                ..
            }
        ));
        assert!(job.fail("nope").is_err());
        assert_eq!(job.status, JobStatus::Queued);
    }

    #[test]
    fn terminal_states_are_final() {
        let mut job = queued();
        job.start("starting").unwrap();
        job.fail("boom").unwrap();

        assert!(job.start("again").is_err());
        assert!(!job.record_progress(80, "ghost"));
        assert!(job.complete(PathBuf::from("/tmp/x.png"), "done").is_err());
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 0);
    }

    #[test]
    fn empty_artifact_path_rejected() {
        let mut job = queued();
        job.start("starting").unwrap();
        assert!(matches!(
            job.complete(PathBuf::new(), "done"),
            Err(JobQueueError::MissingArtifact(_))
        ));
        assert_eq!(job.status, JobStatus::Processing);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(JobStatus::Processing).unwrap(),
            json!("processing")
        );
        assert!(JobStatus::Completed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
    }
}
