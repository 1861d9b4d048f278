//! Artifact cache management
//!
//! Helpers for locating, listing and clearing the directory cutouts are
//! persisted into. The CLI uses these for `--list-artifacts`,
//! `--clear-cache` and `--show-cache-dir`.

use crate::{
    error::{CutoutError, Result},
    tracing_config::spans,
};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// Information about a cached artifact
#[derive(Debug, Clone)]
pub struct CachedArtifactInfo {
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Last modification time, when the platform reports one
    pub modified: Option<DateTime<Local>>,
}

/// Default artifact directory under the platform cache location
///
/// - Linux: `~/.cache/bgcutout/artifacts/`
/// - macOS: `~/Library/Caches/bgcutout/artifacts/`
/// - Windows: `%LOCALAPPDATA%/bgcutout/artifacts/`
///
/// # Errors
/// - Platform cache directory cannot be determined
pub fn default_artifact_dir() -> Result<PathBuf> {
    Ok(dirs::cache_dir()
        .ok_or_else(|| {
            CutoutError::invalid_config(
                "Failed to determine cache directory. Pass an explicit artifact directory.",
            )
        })?
        .join("bgcutout")
        .join("artifacts"))
}

/// View over an artifact directory
#[derive(Debug)]
pub struct ArtifactCache {
    cache_dir: PathBuf,
}

impl ArtifactCache {
    pub fn new<P: Into<PathBuf>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// List persisted artifacts, sorted by file name
    ///
    /// In-flight temporary files are skipped.
    ///
    /// # Errors
    /// - Failed to read the cache directory
    pub fn scan_artifacts(&self) -> Result<Vec<CachedArtifactInfo>> {
        let mut artifacts = Vec::new();

        if !self.cache_dir.exists() {
            return Ok(artifacts);
        }

        let entries = fs::read_dir(&self.cache_dir).map_err(|e| {
            CutoutError::file_io_error("read cache directory", &self.cache_dir, &e)
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                CutoutError::file_io_error("read cache directory entry", &self.cache_dir, &e)
            })?;

            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_file() || Self::is_temporary(file_name) {
                continue;
            }

            let metadata = entry
                .metadata()
                .map_err(|e| CutoutError::file_io_error("read artifact metadata", &path, &e))?;

            artifacts.push(CachedArtifactInfo {
                file_name: file_name.to_string(),
                size_bytes: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Local>::from),
                path,
            });
        }

        artifacts.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(artifacts)
    }

    /// Total bytes held by persisted artifacts
    ///
    /// # Errors
    /// - Failed to read the cache directory
    pub fn total_size(&self) -> Result<u64> {
        Ok(self.scan_artifacts()?.iter().map(|a| a.size_bytes).sum())
    }

    /// Remove every file in the artifact directory
    ///
    /// # Returns
    /// Names of the removed artifacts
    ///
    /// # Errors
    /// - Failed to read the cache directory
    /// - Failed to remove a file
    pub fn clear_all(&self) -> Result<Vec<String>> {
        let _span = spans::cache_operation("clear_all", &self.cache_dir).entered();
        let mut removed = Vec::new();

        if !self.cache_dir.exists() {
            return Ok(removed);
        }

        let entries = fs::read_dir(&self.cache_dir).map_err(|e| {
            CutoutError::file_io_error("read cache directory", &self.cache_dir, &e)
        })?;

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();

            log::info!("Removing cached artifact: {}", name);
            fs::remove_file(&path)
                .map_err(|e| CutoutError::file_io_error("remove cached artifact", &path, &e))?;
            if !Self::is_temporary(&name) {
                removed.push(name);
            }
        }

        removed.sort();
        Ok(removed)
    }

    fn is_temporary(file_name: &str) -> bool {
        file_name.starts_with('.') && file_name.ends_with(".tmp")
    }
}

/// Format file size in human-readable format
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS.get(unit_index).unwrap_or(&"B"))
    } else {
        format!("{:.1} {}", size, UNITS.get(unit_index).unwrap_or(&"B"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_default_artifact_dir_layout() {
        if let Ok(dir) = default_artifact_dir() {
            assert!(dir.ends_with(Path::new("bgcutout").join("artifacts")));
        }
    }

    #[test]
    fn test_scan_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp_dir.path().join("missing"));
        assert!(cache.scan_artifacts().unwrap().is_empty());
        assert_eq!(cache.total_size().unwrap(), 0);
        assert!(cache.clear_all().unwrap().is_empty());
    }

    #[test]
    fn test_scan_skips_temporaries_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("cutout.png"), b"12345").unwrap();
        fs::write(temp_dir.path().join("b.png"), b"12").unwrap();
        fs::write(temp_dir.path().join(".cutout.png.1-0.tmp"), b"partial").unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();

        let cache = ArtifactCache::new(temp_dir.path());
        let artifacts = cache.scan_artifacts().unwrap();

        let names: Vec<_> = artifacts.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["b.png", "cutout.png"]);
        assert_eq!(cache.total_size().unwrap(), 7);
        assert!(artifacts.iter().all(|a| a.modified.is_some()));
    }

    #[test]
    fn test_clear_all_removes_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("cutout.png"), b"x").unwrap();
        fs::write(temp_dir.path().join(".cutout.png.1-0.tmp"), b"y").unwrap();

        let cache = ArtifactCache::new(temp_dir.path());
        let removed = cache.clear_all().unwrap();

        assert_eq!(removed, vec!["cutout.png".to_string()]);
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}
