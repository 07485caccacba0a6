use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the artifact store.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact directory {path} is unusable: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid artifact name: {0:?}")]
    InvalidName(String),

    #[error("failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("path {0} is outside the artifact directory")]
    OutsideStore(PathBuf),

    #[error("background sweep task failed: {0}")]
    Task(String),
}

impl ArtifactError {
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
