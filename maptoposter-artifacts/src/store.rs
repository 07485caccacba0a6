//! On-disk store for rendered posters.
//!
//! Writers stage bytes in a hidden temp file inside the store directory and
//! atomically rename it to its final name, so a sweep or a download never
//! sees a half-written poster.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::error::ArtifactError;

/// Extension of every finished artifact.
pub const ARTIFACT_EXTENSION: &str = "png";

const STAGING_PREFIX: &str = ".staging-";
const STAGING_SUFFIX: &str = ".part";
const TEMP_DIR_PREFIX: &str = "maptoposter_";

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Finished artifacts inspected.
    pub scanned: usize,
    /// Artifacts older than the TTL that were removed.
    pub deleted: usize,
    /// Artifacts that could not be inspected or removed.
    pub failed: usize,
}

/// A directory of finished poster files.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| ArtifactError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;
        let root = dir.canonicalize().map_err(|source| ArtifactError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;
        debug!(root = %root.display(), "artifact store opened");
        Ok(Self { root })
    }

    /// Create a store in a fresh `maptoposter_*` directory under the system
    /// temp dir. The directory outlives the returned value.
    pub fn temporary() -> Result<Self, ArtifactError> {
        let dir = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir()
            .map_err(|source| ArtifactError::Directory {
                path: std::env::temp_dir(),
                source,
            })?;
        Self::open(dir.keep())
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` as the artifact `name` and return its final path.
    ///
    /// `name` must be a bare `*.png` file name.
    pub fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, ArtifactError> {
        validate_name(name)?;
        let target = self.root.join(name);
        let write_err = |source| ArtifactError::Write {
            path: target.clone(),
            source,
        };

        let mut staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(STAGING_SUFFIX)
            .tempfile_in(&self.root)
            .map_err(write_err)?;
        staged.write_all(bytes).map_err(write_err)?;
        staged.as_file().sync_all().map_err(write_err)?;
        staged
            .persist(&target)
            .map_err(|e| write_err(e.error))?;

        debug!(path = %target.display(), size = bytes.len(), "artifact written");
        Ok(target)
    }

    /// Check that `path` names an existing artifact of this store.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf, ArtifactError> {
        if path.parent() != Some(self.root.as_path()) || !is_artifact_name(path) {
            return Err(ArtifactError::OutsideStore(path.to_path_buf()));
        }
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => Ok(path.to_path_buf()),
            Ok(_) => Err(ArtifactError::NotFound(path.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ArtifactError::NotFound(path.to_path_buf()))
            }
            Err(source) => Err(ArtifactError::Write {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Delete finished artifacts whose mtime is older than `now - ttl`.
    ///
    /// Staging files and anything that is not a regular `*.png` file are left
    /// alone. A file that cannot be inspected or removed is logged and
    /// counted, and the sweep moves on.
    pub fn sweep_expired(&self, now: SystemTime, ttl: Duration) -> Result<SweepReport, ArtifactError> {
        let entries = fs::read_dir(&self.root).map_err(|source| ArtifactError::Directory {
            path: self.root.clone(),
            source,
        })?;

        let mut report = SweepReport::default();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "failed to read artifact directory entry");
                    report.failed += 1;
                    continue;
                }
            };
            let path = entry.path();
            if !is_artifact_name(&path) {
                continue;
            }

            let modified = match entry.metadata() {
                Ok(meta) if meta.is_file() => meta.modified(),
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => Err(e),
            };
            report.scanned += 1;
            let modified = match modified {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot read artifact mtime");
                    report.failed += 1;
                    continue;
                }
            };

            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= ttl {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), age_secs = age.as_secs(), "expired artifact removed");
                    report.deleted += 1;
                }
                // a concurrent sweep got there first
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to remove expired artifact");
                    report.failed += 1;
                }
            }
        }

        if report.deleted > 0 {
            info!(deleted = report.deleted, root = %self.root.display(), "cleaned up expired artifacts");
        }
        Ok(report)
    }

    /// Run [`ArtifactStore::sweep_expired`] against the current time on the
    /// blocking pool.
    pub async fn sweep(&self, ttl: Duration) -> Result<SweepReport, ArtifactError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.sweep_expired(SystemTime::now(), ttl))
            .await
            .map_err(|e| ArtifactError::Task(e.to_string()))?
    }

    /// Remove the whole store directory.
    pub fn remove_all(&self) -> Result<(), ArtifactError> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {
                info!(root = %self.root.display(), "artifact directory removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ArtifactError::Directory {
                path: self.root.clone(),
                source,
            }),
        }
    }
}

fn validate_name(name: &str) -> Result<(), ArtifactError> {
    let bare = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
    if bare && is_artifact_name(Path::new(name)) {
        Ok(())
    } else {
        Err(ArtifactError::InvalidName(name.to_string()))
    }
}

fn is_artifact_name(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with('.')
        && path.extension().and_then(|e| e.to_str()) == Some(ARTIFACT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    const HOUR: Duration = Duration::from_secs(3600);

    fn age_file(path: &Path, by: Duration) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    #[test]
    fn write_places_file_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let path = store.write("paris_noir_20240101_120000_ab12cd34.png", b"png").unwrap();

        assert_eq!(path.parent(), Some(store.root()));
        assert_eq!(fs::read(&path).unwrap(), b"png");
        // no staging leftovers
        assert_eq!(fs::read_dir(store.root()).unwrap().count(), 1);
    }

    #[test]
    fn write_rejects_unsafe_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        for name in ["../escape.png", "nested/x.png", ".hidden.png", "poster.jpg", ""] {
            assert!(
                matches!(store.write(name, b"x"), Err(ArtifactError::InvalidName(_))),
                "{name} accepted"
            );
        }
    }

    #[test]
    fn resolve_distinguishes_missing_and_foreign_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let path = store.write("a.png", b"png").unwrap();
        assert_eq!(store.resolve(&path).unwrap(), path);

        fs::remove_file(&path).unwrap();
        assert!(store.resolve(&path).unwrap_err().is_not_found());

        let elsewhere = Path::new("/etc/passwd.png");
        assert!(matches!(
            store.resolve(elsewhere),
            Err(ArtifactError::OutsideStore(_))
        ));
    }

    #[test]
    fn sweep_removes_old_and_keeps_young() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let old = store.write("old.png", b"old").unwrap();
        let young = store.write("young.png", b"young").unwrap();
        age_file(&old, 3 * HOUR);
        age_file(&young, HOUR);

        let report = store.sweep_expired(SystemTime::now(), 2 * HOUR).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.failed, 0);
        assert!(!old.exists());
        assert!(young.exists());

        let again = store.sweep_expired(SystemTime::now(), 2 * HOUR).unwrap();
        assert_eq!(again.deleted, 0);
        assert!(young.exists());
    }

    #[test]
    fn sweep_ignores_staging_and_foreign_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let staging = store.root().join(".staging-abc.part");
        let notes = store.root().join("notes.txt");
        let folder = store.root().join("folder.png");
        fs::write(&staging, b"partial").unwrap();
        fs::write(&notes, b"keep me").unwrap();
        fs::create_dir(&folder).unwrap();
        age_file(&staging, 5 * HOUR);
        age_file(&notes, 5 * HOUR);

        let report = store.sweep_expired(SystemTime::now(), HOUR).unwrap();
        assert_eq!(report, SweepReport::default());
        assert!(staging.exists());
        assert!(notes.exists());
        assert!(folder.exists());
    }

    #[test]
    fn future_mtime_counts_as_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let path = store.write("skewed.png", b"x").unwrap();
        let earlier = SystemTime::now() - 10 * HOUR;

        let report = store.sweep_expired(earlier, HOUR).unwrap();
        assert_eq!(report.deleted, 0);
        assert!(path.exists());
    }

    #[test]
    fn sweep_of_missing_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path().join("gone")).unwrap();
        store.remove_all().unwrap();
        assert!(matches!(
            store.sweep_expired(SystemTime::now(), HOUR),
            Err(ArtifactError::Directory { .. })
        ));
        // removing twice is fine
        store.remove_all().unwrap();
    }

    #[test]
    fn temporary_store_uses_prefixed_directory() {
        let store = ArtifactStore::temporary().unwrap();
        let name = store.root().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(TEMP_DIR_PREFIX));
        store.remove_all().unwrap();
        assert!(!store.root().exists());
    }

    #[tokio::test]
    async fn async_sweep_runs_on_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let old = store.write("old.png", b"old").unwrap();
        age_file(&old, 3 * HOUR);

        let report = store.sweep(2 * HOUR).await.unwrap();
        assert_eq!(report.deleted, 1);
    }
}
