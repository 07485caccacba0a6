//! Progress callback handed to render pipelines.

use uuid::Uuid;

use crate::registry::JobRegistry;

/// Reports progress for one job back into the registry.
///
/// Cheap to clone. Reports that would lower the recorded percentage are
/// stale and dropped, as are reports arriving after the job reached a
/// terminal state.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    registry: JobRegistry,
    job_id: Uuid,
}

impl ProgressReporter {
    pub fn new(registry: JobRegistry, job_id: Uuid) -> Self {
        Self { registry, job_id }
    }

    #[inline]
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Record `percent` and a human readable step description.
    pub fn report(&self, percent: u8, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(job_id = %self.job_id, percent, %message, "job progress");
        let result = self.registry.update(&self.job_id, |record| {
            record.record_progress(percent, message);
            Ok(())
        });
        if let Err(e) = result {
            tracing::warn!(job_id = %self.job_id, %e, "dropping progress report");
        }
    }

    /// Replace the step description without moving the percentage.
    pub fn note(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(job_id = %self.job_id, %message, "job note");
        let result = self.registry.update(&self.job_id, |record| {
            record.set_message(message);
            Ok(())
        });
        if let Err(e) = result {
            tracing::warn!(job_id = %self.job_id, %e, "dropping progress note");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobStatus;
    use serde_json::json;

    #[test]
    fn reports_flow_into_registry() {
        let registry = JobRegistry::new();
        let job = registry.create(json!({}));
        registry.update(&job.id, |r| r.start("starting")).unwrap();

        let reporter = ProgressReporter::new(registry.clone(), job.id);
        reporter.report(35, "Downloading street network...");
        let snapshot = registry.get(&job.id).unwrap();
        assert_eq!(snapshot.progress, 35);
        assert_eq!(snapshot.message, "Downloading street network...");

        reporter.report(80, "Rendering map...");
        reporter.report(15, "Downloading street network...");
        let snapshot = registry.get(&job.id).unwrap();
        assert_eq!(snapshot.progress, 80);
        assert_eq!(snapshot.message, "Rendering map...");

        reporter.note("Downloading parks...");
        let snapshot = registry.get(&job.id).unwrap();
        assert_eq!(snapshot.progress, 80);
        assert_eq!(snapshot.message, "Downloading parks...");
    }

    #[test]
    fn reports_before_start_are_ignored() {
        let registry = JobRegistry::new();
        let job = registry.create(json!({}));
        let reporter = ProgressReporter::new(registry.clone(), job.id);
        reporter.report(50, "too soon");
        reporter.note("also too soon");
        let snapshot = registry.get(&job.id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Queued);
        assert_eq!(snapshot.progress, 0);
        assert_eq!(snapshot.message, crate::types::JobRecord::QUEUED_MESSAGE);
    }

    #[test]
    fn reports_for_missing_job_do_not_panic() {
        let reporter = ProgressReporter::new(JobRegistry::new(), Uuid::new_v4());
        reporter.report(10, "orphan");
    }
}
