//! Screen transition contract
//!
//! The payload handed to the editor screen, and the navigation seam that
//! delivers it.

use crate::{
    error::{CutoutError, Result},
    types::{ImageReference, PersistedCutout},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Payload for the downstream editor screen
///
/// Can only be built from a picked image and a persisted cutout, so both
/// references are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenTransition {
    original_image: ImageReference,
    cutout_image: ImageReference,
}

impl ScreenTransition {
    #[must_use]
    pub fn new(original_image: ImageReference, cutout: &PersistedCutout) -> Self {
        Self {
            original_image,
            cutout_image: cutout.reference.clone(),
        }
    }

    #[must_use]
    pub fn original_image(&self) -> &ImageReference {
        &self.original_image
    }

    #[must_use]
    pub fn cutout_image(&self) -> &ImageReference {
        &self.cutout_image
    }
}

/// Forward navigation capability
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Push `screen` with `transition` as its parameters
    ///
    /// # Errors
    /// - The navigation stack rejected the transition
    async fn navigate(&self, screen: &str, transition: &ScreenTransition) -> Result<()>;
}

/// Navigator that records every transition it receives
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<(String, ScreenTransition)>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All transitions so far, oldest first
    pub fn history(&self) -> Vec<(String, ScreenTransition)> {
        self.history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<(String, ScreenTransition)> {
        self.history().pop()
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn navigate(&self, screen: &str, transition: &ScreenTransition) -> Result<()> {
        self.history
            .lock()
            .map_err(|_| CutoutError::internal("navigation history lock poisoned"))?
            .push((screen.to_string(), transition.clone()));
        Ok(())
    }
}

/// Navigator that emits each transition as one JSON line
///
/// `{"screen":"Editor","params":{"originalImage":"...","cutoutImage":"..."}}`
pub struct JsonLinesNavigator<W> {
    writer: Mutex<W>,
}

#[derive(Serialize)]
struct NavigationRecord<'a> {
    screen: &'a str,
    params: &'a ScreenTransition,
}

impl<W: std::io::Write + Send> JsonLinesNavigator<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the underlying writer
    ///
    /// # Errors
    /// - Writer lock was poisoned by a panicking writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|_| CutoutError::internal("navigation writer lock poisoned"))
    }
}

#[async_trait]
impl<W: std::io::Write + Send> Navigator for JsonLinesNavigator<W> {
    async fn navigate(&self, screen: &str, transition: &ScreenTransition) -> Result<()> {
        let line = serde_json::to_string(&NavigationRecord {
            screen,
            params: transition,
        })
        .map_err(|e| CutoutError::navigation(format!("Failed to serialize transition: {}", e)))?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| CutoutError::internal("navigation writer lock poisoned"))?;
        writeln!(writer, "{}", line)
            .and_then(|()| writer.flush())
            .map_err(|e| CutoutError::navigation(format!("Failed to emit transition: {}", e)))
    }
}
