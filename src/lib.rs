#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # bgcutout
//!
//! Photo acquisition pipeline: the user picks an image, a remote service
//! strips its background, the cutout is cached on the device, and both the
//! original and the cutout are handed to an editor screen.
//!
//! ## Features
//!
//! - **Pluggable capabilities**: picker, remover, store and navigator are
//!   traits, so the orchestrator runs unchanged against real services or mocks
//! - **HTTP removal client**: JSON or raw image responses, optional API key
//! - **Atomic local cache**: cutouts are written to a temp file and renamed
//! - **Observable state**: `watch` channel with the current state and loading flag
//! - **CLI Integration**: `bgcutout` binary (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgcutout::{
//!     build_http_orchestrator, PipelineConfig, PipelineOutcome, RecordingNavigator,
//!     RemovalClientConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let navigator = Arc::new(RecordingNavigator::new());
//! let mut orchestrator = build_http_orchestrator(
//!     Some("photo.jpg".into()),
//!     RemovalClientConfig::new("https://api.example.com/v1/remove").with_api_key("key"),
//!     "/tmp/bgcutout",
//!     PipelineConfig::default(),
//!     navigator.clone(),
//! )?;
//!
//! match orchestrator.pick_and_process().await {
//!     PipelineOutcome::Completed(run) => {
//!         println!("cutout at {}", run.transition.cutout_image());
//!     },
//!     PipelineOutcome::Cancelled => {},
//!     PipelineOutcome::Failed(failure) => eprintln!("{}", failure.user_message()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, spinner and subscriber setup
//! - `tracing-json`: JSON log output
//! - `tracing-files`: log to a file

pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod navigation;
pub mod observer;
pub mod orchestrator;
pub mod picker;
pub mod removal;
pub mod store;
pub mod tracing_config;
pub mod types;

#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;

// Public API exports
pub use cache::{default_artifact_dir, format_size, ArtifactCache, CachedArtifactInfo};
pub use config::{
    MediaType, PickerOptions, PipelineConfig, PipelineConfigBuilder, RemovalClientConfig,
};
pub use error::{CutoutError, FailureKind, PipelineFailure, Result};
pub use navigation::{JsonLinesNavigator, Navigator, RecordingNavigator, ScreenTransition};
pub use observer::{
    LoggingObserver, NoOpObserver, PipelineObserver, PipelineStage, PipelineStatus,
    PipelineTimings,
};
pub use orchestrator::{AcquisitionOrchestrator, CompletedRun, PipelineOutcome};
pub use picker::{FilePicker, ImagePicker};
pub use removal::{BackgroundRemover, HttpBackgroundRemover};
pub use store::{ArtifactStore, LocalArtifactStore};
pub use types::{
    CutoutPayload, ImageReference, PersistedCutout, PickerOutcome, PipelineState, RemovalOutcome,
};

pub use tracing_config::{events, spans, TracingConfig, TracingFormat, TracingGuard, TracingOutput};
#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, new_session_id};

/// Wire an orchestrator from the stock file picker, HTTP remover and local store
///
/// # Arguments
///
/// * `selection` - Image the picker returns; `None` behaves like a dismissed picker
/// * `removal` - Removal service connection settings
/// * `artifact_dir` - Directory cutouts are persisted into (also used for picker staging)
/// * `config` - Pipeline settings
/// * `navigator` - Receiver of the screen transition
///
/// # Errors
/// - Invalid removal endpoint or pipeline configuration
/// - HTTP client could not be created
pub fn build_http_orchestrator<P: Into<PathBuf>>(
    selection: Option<PathBuf>,
    removal: RemovalClientConfig,
    artifact_dir: P,
    config: PipelineConfig,
    navigator: Arc<dyn Navigator>,
) -> Result<AcquisitionOrchestrator> {
    let artifact_dir = artifact_dir.into();
    let picker = FilePicker::new(selection, artifact_dir.join(".picker"));
    let remover = HttpBackgroundRemover::new(removal)?;
    let store = LocalArtifactStore::new(artifact_dir);

    AcquisitionOrchestrator::new(
        config,
        Arc::new(picker),
        Arc::new(remover),
        Arc::new(store),
        navigator,
    )
}
