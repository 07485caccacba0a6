//! Render pipeline errors.

use std::io;
use std::path::PathBuf;

use maptoposter_artifacts::ArtifactError;
use maptoposter_job_queue::JobQueueError;
use thiserror::Error;

/// Errors that end a poster render.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid poster request: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error("theme '{0}' not found")]
    UnknownTheme(String),

    #[error("theme '{name}' is invalid: {reason}")]
    InvalidTheme { name: String, reason: String },

    #[error("themes directory {path} is unreadable: {source}")]
    ThemesDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("http error: {0}")]
    Http(String),

    #[error("could not find coordinates for {0}")]
    Geocode(String),

    #[error("failed to download {layer}: {message}")]
    DataSource { layer: &'static str, message: String },

    #[error("cannot load font {path}: {reason}")]
    Font { path: PathBuf, reason: String },

    #[error("canvas error: {0}")]
    Canvas(String),

    #[error("failed to encode poster: {0}")]
    Encode(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl From<RenderError> for JobQueueError {
    fn from(err: RenderError) -> Self {
        JobQueueError::ExecutionFailed(err.to_string())
    }
}
