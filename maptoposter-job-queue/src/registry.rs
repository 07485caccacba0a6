//! Concurrent map of job records.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

use crate::error::JobQueueError;
use crate::types::{JobCounts, JobRecord};

/// Shared registry of every job accepted by this process.
///
/// Backed by a sharded map, so jobs with different ids do not contend on a
/// single lock. A shard lock is held only while a record is cloned or a
/// mutator assigns fields; callers must never run I/O or rendering inside
/// [`JobRegistry::update`].
///
/// Records are kept for the lifetime of the process.
// TODO: evict terminal records older than the artifact TTL so long-running
// instances do not grow without bound.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<DashMap<Uuid, JobRecord>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new queued job and return its initial snapshot.
    pub fn create(&self, request: Value) -> JobRecord {
        loop {
            let id = Uuid::new_v4();
            if let Entry::Vacant(slot) = self.jobs.entry(id) {
                let record = JobRecord::new(id, request);
                slot.insert(record.clone());
                return record;
            }
        }
    }

    /// Snapshot of a job, if it exists.
    pub fn get(&self, id: &Uuid) -> Option<JobRecord> {
        self.jobs.get(id).map(|entry| entry.value().clone())
    }

    /// Apply `mutator` to a job while holding its entry lock.
    ///
    /// Returns the updated snapshot. If the mutator fails, its error is
    /// returned and readers keep seeing whatever the mutator left, so
    /// mutators must validate before assigning.
    pub fn update<F>(&self, id: &Uuid, mutator: F) -> Result<JobRecord, JobQueueError>
    where
        F: FnOnce(&mut JobRecord) -> Result<(), JobQueueError>,
    {
        let mut entry = self.jobs.get_mut(id).ok_or(JobQueueError::NotFound(*id))?;
        mutator(entry.value_mut())?;
        Ok(entry.value().clone())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Count jobs per status.
    pub fn counts(&self) -> JobCounts {
        let mut counts = JobCounts::default();
        for entry in self.jobs.iter() {
            counts.add(entry.value().status);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobStatus;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn create_then_get() {
        let registry = JobRegistry::new();
        let created = registry.create(json!({"city": "Lisbon"}));
        let fetched = registry.get(&created.id).expect("job exists");
        assert_eq!(fetched.status, JobStatus::Queued);
        assert_eq!(fetched.request["city"], "Lisbon");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let registry = JobRegistry::new();
        let id = Uuid::new_v4();
        assert!(registry.get(&id).is_none());
        let err = registry.update(&id, |_| Ok(())).unwrap_err();
        assert!(matches!(err, JobQueueError::NotFound(missing) if missing == id));
    }

    #[test]
    fn rejected_transition_leaves_record_untouched() {
        let registry = JobRegistry::new();
        let job = registry.create(json!({}));
        let err = registry
            .update(&job.id, |r| r.fail("too early"))
            .unwrap_err();
        assert!(matches!(err, JobQueueError::InvalidTransition { .. }));
        let after = registry.get(&job.id).unwrap();
        assert_eq!(after.status, JobStatus::Queued);
        assert!(after.error.is_none());
    }

    #[test]
    fn concurrent_creates_yield_distinct_ids() {
        let registry = JobRegistry::new();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|i| registry.create(json!({"t": t, "i": i})).id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id), "duplicate job id {id}");
            }
        }
        assert_eq!(ids.len(), 400);
        assert_eq!(registry.len(), 400);
    }

    #[test]
    fn concurrent_progress_updates_are_not_lost() {
        let registry = JobRegistry::new();
        let job = registry.create(json!({}));
        registry.update(&job.id, |r| r.start("starting")).unwrap();

        let handles: Vec<_> = (1..=90u8)
            .map(|p| {
                let registry = registry.clone();
                let id = job.id;
                std::thread::spawn(move || {
                    registry
                        .update(&id, |r| {
                            r.record_progress(p, format!("step {p}"));
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // whatever the interleaving, the highest report wins
        assert_eq!(registry.get(&job.id).unwrap().progress, 90);
    }

    #[test]
    fn counts_by_status() {
        let registry = JobRegistry::new();
        let a = registry.create(json!({}));
        let b = registry.create(json!({}));
        registry.create(json!({}));
        registry.update(&a.id, |r| r.start("go")).unwrap();
        registry.update(&b.id, |r| r.start("go")).unwrap();
        registry.update(&b.id, |r| r.fail("boom")).unwrap();

        let counts = registry.counts();
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.processing, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.completed, 0);
        assert_eq!(counts.total(), 3);
    }
}
