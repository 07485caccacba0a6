//! In-memory job orchestration for poster generation.
//!
//! Jobs are accepted synchronously, recorded in a concurrent registry and then
//! executed in the background. Clients observe them only through registry
//! snapshots.
//!
//! # Architecture
//!
//! - [`JobQueueClient`] - Submits jobs and drives each one to a terminal state
//! - [`JobRegistry`] - Concurrent map from job id to [`JobRecord`]
//! - [`RenderPipeline`] - Trait for the blocking work a job performs
//! - [`ProgressReporter`] - Progress callback handed to the pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! use maptoposter_job_queue::{JobQueueClient, JobQueueError, ProgressReporter, RenderPipeline};
//! use serde_json::{json, Value};
//!
//! struct Sketch;
//!
//! impl RenderPipeline for Sketch {
//!     fn render(&self, _request: &Value, progress: &ProgressReporter) -> Result<PathBuf, JobQueueError> {
//!         progress.report(50, "Drawing...");
//!         Ok(PathBuf::from("/tmp/sketch.png"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = JobQueueClient::new(Arc::new(Sketch));
//!     let job = client.submit(json!({"city": "Rome"}));
//!     println!("queued job {}", job.id);
//! }
//! ```

mod client;
mod error;
mod pipeline;
mod progress;
mod registry;
mod types;

pub use client::JobQueueClient;
pub use error::JobQueueError;
pub use pipeline::RenderPipeline;
pub use progress::ProgressReporter;
pub use registry::JobRegistry;
pub use types::{JobCounts, JobRecord, JobStatus, MAX_RUNNING_PROGRESS, START_PROGRESS};
