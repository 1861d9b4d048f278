//! Core data types shared across the acquisition pipeline

use crate::error::{CutoutError, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// Opaque locator for an image resource
///
/// Either device-native (handed out by the picker) or locally persisted
/// (handed out by the artifact store). References are never mutated, only
/// replaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageReference(String);

impl ImageReference {
    /// Wrap an existing URI or path string
    pub fn new<S: Into<String>>(uri: S) -> Self {
        Self(uri.into())
    }

    /// Build a `file://` URI for a local path
    ///
    /// Relative paths are resolved against the working directory. Reserved
    /// characters (spaces, `#`, `%`, ...) are percent-encoded.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        match reqwest::Url::from_file_path(&absolute) {
            Ok(url) => Self(url.into()),
            Err(()) => Self(format!("{}{}", FILE_SCHEME, absolute.display())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve to a local filesystem path
    ///
    /// Returns `None` for references with a non-file scheme (`https://`,
    /// `content://`, ...).
    #[must_use]
    pub fn to_local_path(&self) -> Option<PathBuf> {
        if let Some(rest) = self.0.strip_prefix(FILE_SCHEME) {
            let decoded = reqwest::Url::parse(&self.0)
                .ok()
                .and_then(|url| url.to_file_path().ok());
            return Some(decoded.unwrap_or_else(|| PathBuf::from(rest)));
        }
        if self.0.contains("://") || self.0.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.0))
        }
    }

    /// Whether the reference points at a remote http(s) resource
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageReference {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ImageReference {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Base64-encoded image bytes produced by the removal service
///
/// Lives only in memory between receipt and persistence.
#[derive(Clone, PartialEq, Eq)]
pub struct CutoutPayload(String);

impl CutoutPayload {
    pub fn new<S: Into<String>>(base64: S) -> Self {
        Self(base64.into())
    }

    /// Encode raw image bytes
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(general_purpose::STANDARD.encode(bytes))
    }

    #[must_use]
    pub fn as_base64(&self) -> &str {
        &self.0
    }

    /// True when the payload carries no image data
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body().is_empty()
    }

    /// Decode into raw image bytes
    ///
    /// Accepts a `data:<mime>;base64,` prefix and ignores embedded whitespace.
    ///
    /// # Errors
    /// - Payload is empty
    /// - Payload is not valid standard base64
    pub fn decode(&self) -> Result<Vec<u8>> {
        let body: String = self.body().chars().filter(|c| !c.is_whitespace()).collect();
        if body.is_empty() {
            return Err(CutoutError::decode("cutout payload is empty"));
        }
        general_purpose::STANDARD
            .decode(body.as_bytes())
            .map_err(|e| CutoutError::decode(format!("invalid base64 cutout payload: {}", e)))
    }

    fn body(&self) -> &str {
        let trimmed = self.0.trim();
        match trimmed.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => trimmed,
        }
    }
}

// Payloads are large; keep debug output readable.
impl std::fmt::Debug for CutoutPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CutoutPayload")
            .field("base64_len", &self.0.len())
            .finish()
    }
}

/// A cutout that has been written to local storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedCutout {
    /// Reference handed downstream
    pub reference: ImageReference,
    /// Location of the written file
    pub path: PathBuf,
    /// Number of decoded bytes written
    pub size_bytes: u64,
}

/// Orchestrator state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PipelineState {
    #[default]
    Idle,
    Picking,
    Processing,
    Succeeded,
    Failed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Picking => "picking",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a picker interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    /// Picker dismissed without a selection
    Cancelled,
    /// A single image was chosen
    Selected(ImageReference),
}

/// Result of a removal call that did not error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    Cutout(CutoutPayload),
    /// The service answered but produced no image
    Empty,
}

impl RemovalOutcome {
    /// Normalise a payload, mapping blank results to `Empty`
    #[must_use]
    pub fn from_payload(payload: CutoutPayload) -> Self {
        if payload.is_empty() {
            Self::Empty
        } else {
            Self::Cutout(payload)
        }
    }
}
