//! Local artifact store
//!
//! Persists decoded cutout payloads to device-local storage and hands back a
//! re-loadable `file://` reference. Writes go to a temporary sibling first and
//! are renamed into place, so a reader never observes a partially written
//! cutout.

use crate::{
    error::{CutoutError, Result},
    tracing_config::spans,
    types::{CutoutPayload, ImageReference, PersistedCutout},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::Instrument;

/// Storage seam used by the orchestrator
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write `payload` under `file_name`, replacing any previous file of that name
    ///
    /// # Errors
    /// - Invalid file name
    /// - Payload is not valid base64
    /// - Directory creation or write failure (space, permissions, ...)
    async fn save(&self, file_name: &str, payload: &CutoutPayload) -> Result<PersistedCutout>;
}

/// Filesystem-backed artifact store rooted at a single directory
#[derive(Debug)]
pub struct LocalArtifactStore {
    root: PathBuf,
    write_counter: AtomicU64,
}

impl LocalArtifactStore {
    /// Create a store rooted at `root`; the directory is created on first write
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            write_counter: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a given logical name resolves to
    ///
    /// # Errors
    /// - Invalid file name
    pub fn path_for(&self, file_name: &str) -> Result<PathBuf> {
        validate_file_name(file_name)?;
        Ok(self.root.join(file_name))
    }

    fn temp_path_for(&self, file_name: &str) -> PathBuf {
        let sequence = self.write_counter.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(
            ".{}.{}-{}.tmp",
            file_name,
            std::process::id(),
            sequence
        ))
    }

    async fn write_atomically(&self, target: &Path, temp: &Path, bytes: &[u8]) -> Result<()> {
        let mut file = tokio::fs::File::create(temp)
            .await
            .map_err(|e| storage_error("create temporary cutout file", temp, &e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| storage_error("write cutout", temp, &e))?;
        file.sync_all()
            .await
            .map_err(|e| storage_error("flush cutout", temp, &e))?;
        drop(file);

        tokio::fs::rename(temp, target)
            .await
            .map_err(|e| storage_error("move cutout into place", target, &e))
    }

    async fn persist(&self, file_name: &str, target: &Path, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| storage_error("create artifact directory", &self.root, &e))?;

        let temp = self.temp_path_for(file_name);
        if let Err(e) = self.write_atomically(target, &temp, bytes).await {
            if let Err(cleanup_err) = tokio::fs::remove_file(&temp).await {
                log::debug!(
                    "No temporary file to clean up at {}: {}",
                    temp.display(),
                    cleanup_err
                );
            }
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn save(&self, file_name: &str, payload: &CutoutPayload) -> Result<PersistedCutout> {
        let target = self.path_for(file_name)?;
        let bytes = payload.decode()?;

        self.persist(file_name, &target, &bytes)
            .instrument(spans::persist(file_name, &target))
            .await?;

        log::debug!("Persisted {} bytes to {}", bytes.len(), target.display());

        Ok(PersistedCutout {
            reference: ImageReference::from_path(&target),
            size_bytes: bytes.len() as u64,
            path: target,
        })
    }
}

fn storage_error(operation: &str, path: &Path, error: &std::io::Error) -> CutoutError {
    CutoutError::storage(format!(
        "Failed to {} '{}': {}",
        operation,
        path.display(),
        error
    ))
}

/// Validate a logical artifact file name
///
/// Names must be a single path component: no separators, no `.`/`..`.
///
/// # Errors
/// - Empty name
/// - Name containing a path separator or NUL byte
/// - Name that is `.` or `..`
pub fn validate_file_name(file_name: &str) -> Result<()> {
    if file_name.trim().is_empty() {
        return Err(CutoutError::invalid_config("Cutout file name cannot be empty"));
    }

    if file_name == "." || file_name == ".." {
        return Err(CutoutError::invalid_config(format!(
            "Cutout file name cannot be '{}'",
            file_name
        )));
    }

    if file_name.contains(['/', '\\', '\0']) {
        return Err(CutoutError::invalid_config(format!(
            "Cutout file name must not contain path separators: {}",
            file_name
        )));
    }

    Ok(())
}
