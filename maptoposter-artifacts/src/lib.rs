//! Storage for rendered poster files and their time-based expiry.

mod error;
mod scheduler;
mod store;

pub use error::ArtifactError;
pub use scheduler::{CleanupScheduler, CleanupTrigger, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};
pub use store::{ArtifactStore, SweepReport, ARTIFACT_EXTENSION};
