//! Image picker capability
//!
//! The orchestrator only depends on the [`ImagePicker`] trait. [`FilePicker`]
//! is the desktop/CLI implementation: it "picks" a preselected path and,
//! like a mobile gallery picker, hands back a compressed copy rather than the
//! original file.

use crate::{
    config::{MediaType, PickerOptions},
    error::{CutoutError, Result},
    types::{ImageReference, PickerOutcome},
};
use async_trait::async_trait;
use image::{codecs::jpeg::JpegEncoder, DynamicImage};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// File extensions the picker accepts
const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif"];

/// Source of user-selected images
#[async_trait]
pub trait ImagePicker: Send + Sync {
    /// Present the picker and wait for the user
    ///
    /// # Errors
    /// - The selection exists but cannot be delivered (unreadable, unsupported)
    async fn pick(&self, options: &PickerOptions) -> Result<PickerOutcome>;
}

/// Picker backed by a path chosen up front (e.g. a CLI argument)
///
/// No path means the user dismissed the picker. Every pick is staged under a
/// fresh name, so a later pick never overwrites a copy an earlier transition
/// still points to.
#[derive(Debug)]
pub struct FilePicker {
    selection: Option<PathBuf>,
    staging_dir: PathBuf,
    staged_count: AtomicU64,
}

impl FilePicker {
    /// # Arguments
    /// * `selection` - Path the user chose, `None` for a cancelled picker
    /// * `staging_dir` - Directory compressed copies are written to
    pub fn new<P: Into<PathBuf>>(selection: Option<PathBuf>, staging_dir: P) -> Self {
        Self {
            selection,
            staging_dir: staging_dir.into(),
            staged_count: AtomicU64::new(0),
        }
    }

    /// `<stem>-<ext>-<timestamp>-<n>.jpg` inside the staging directory
    fn staged_path_for(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("picked");
        let extension = source
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("img")
            .to_ascii_lowercase();
        let sequence = self.staged_count.fetch_add(1, Ordering::Relaxed);

        self.staging_dir.join(format!(
            "{}-{}-{}-{}.jpg",
            stem,
            extension,
            chrono::Utc::now().format("%Y%m%d%H%M%S%3f"),
            sequence
        ))
    }
}

#[async_trait]
impl ImagePicker for FilePicker {
    async fn pick(&self, options: &PickerOptions) -> Result<PickerOutcome> {
        let Some(source) = self.selection.clone() else {
            log::debug!("Picker dismissed without a selection");
            return Ok(PickerOutcome::Cancelled);
        };

        match options.media_type {
            MediaType::Images => {
                if !is_supported_format(&source) {
                    return Err(CutoutError::picker(format!(
                        "Unsupported image type: {}. Supported: {}",
                        source.display(),
                        SUPPORTED_EXTENSIONS.join(", ")
                    )));
                }
            },
        }

        let destination = self.staged_path_for(&source);
        let quality = options.jpeg_quality();

        let staged = tokio::task::spawn_blocking(move || {
            compress_for_upload(&source, &destination, quality).map(|()| destination)
        })
        .await
        .map_err(|e| CutoutError::internal(format!("Picker task failed: {}", e)))??;

        Ok(PickerOutcome::Selected(ImageReference::from_path(staged)))
    }
}

/// Check whether a path has an extension the picker accepts (case-insensitive)
pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
}

/// Load an image, falling back to content sniffing when the extension lies
fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.exists() {
        return Err(CutoutError::file_io_error(
            "read picked image",
            path,
            &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
        ));
    }

    match image::open(path) {
        Ok(img) => Ok(img),
        Err(e) => {
            log::debug!(
                "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                path.display(),
                e
            );
            let data = std::fs::read(path)
                .map_err(|io_err| CutoutError::file_io_error("read picked image", path, &io_err))?;
            image::load_from_memory(&data).map_err(|content_err| {
                CutoutError::picker(format!(
                    "Failed to decode {} ({} bytes): {}",
                    path.display(),
                    data.len(),
                    content_err
                ))
            })
        },
    }
}

/// Re-encode `source` as a JPEG at `quality` into `destination`
fn compress_for_upload(source: &Path, destination: &Path, quality: u8) -> Result<()> {
    let image = load_image(source)?;

    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CutoutError::file_io_error("create picker staging directory", parent, &e))?;
    }

    let file = std::fs::File::create(destination)
        .map_err(|e| CutoutError::file_io_error("create staged image", destination, &e))?;
    let mut writer = BufWriter::new(file);

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    rgb.write_with_encoder(encoder)?;
    writer
        .flush()
        .map_err(|e| CutoutError::file_io_error("flush staged image", destination, &e))?;

    log::debug!(
        "Staged {} as {} (quality {})",
        source.display(),
        destination.display(),
        quality
    );
    Ok(())
}
