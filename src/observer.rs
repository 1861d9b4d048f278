//! Pipeline status reporting
//!
//! Separates status reporting from the orchestrator so different frontends
//! (a CLI spinner, a UI binding, tests) can follow a run without touching its
//! state.

use crate::{error::PipelineFailure, types::PipelineState};
use serde::Serialize;

/// Stages of a single pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStage {
    /// Waiting for the user to choose an image
    Picking,
    /// Remote background removal in flight
    Removing,
    /// Writing the cutout to local storage
    Persisting,
    /// Handing both references to the editor screen
    Navigating,
    /// Run finished successfully
    Completed,
}

impl PipelineStage {
    /// Get a human-readable description of the stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            PipelineStage::Picking => "Waiting for image selection",
            PipelineStage::Removing => "Removing background",
            PipelineStage::Persisting => "Saving cutout",
            PipelineStage::Navigating => "Opening editor",
            PipelineStage::Completed => "Cutout ready",
        }
    }

    /// Typical progress percentage when the stage starts
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            PipelineStage::Picking => 0,
            PipelineStage::Removing => 10,
            PipelineStage::Persisting => 85,
            PipelineStage::Navigating => 95,
            PipelineStage::Completed => 100,
        }
    }
}

/// Snapshot published on every state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PipelineStatus {
    pub state: PipelineState,
    /// Loading indicator; true exactly while `state` is `Processing`
    pub loading: bool,
}

/// Per-stage timings of a completed run (milliseconds)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineTimings {
    pub picking_ms: u64,
    pub removal_ms: u64,
    pub persistence_ms: u64,
    pub navigation_ms: u64,
    pub total_ms: u64,
}

impl PipelineTimings {
    /// Time spent after the user confirmed a selection
    #[must_use]
    pub fn processing_ms(&self) -> u64 {
        self.removal_ms + self.persistence_ms + self.navigation_ms
    }
}

/// Trait for following pipeline runs
pub trait PipelineObserver: Send + Sync {
    /// A stage has started
    fn on_stage(&self, stage: PipelineStage);

    /// The run finished and the transition fired
    fn on_completed(&self, timings: &PipelineTimings);

    /// The run failed at `stage`; the orchestrator is back to idle
    fn on_failure(&self, stage: PipelineStage, failure: &PipelineFailure);

    /// The picker was dismissed
    fn on_cancelled(&self) {}
}

/// Observer that discards everything
pub struct NoOpObserver;

impl PipelineObserver for NoOpObserver {
    fn on_stage(&self, _stage: PipelineStage) {}

    fn on_completed(&self, _timings: &PipelineTimings) {}

    fn on_failure(&self, _stage: PipelineStage, _failure: &PipelineFailure) {}
}

/// Observer that logs stages and outcomes
pub struct LoggingObserver {
    verbose: bool,
}

impl LoggingObserver {
    /// # Arguments
    /// * `verbose` - Whether to include per-stage timings on completion
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl PipelineObserver for LoggingObserver {
    fn on_stage(&self, stage: PipelineStage) {
        log::info!("[{}%] {}", stage.progress_percentage(), stage.description());
    }

    fn on_completed(&self, timings: &PipelineTimings) {
        log::info!("✅ Cutout ready in {}ms", timings.total_ms);

        if self.verbose {
            log::info!("  📊 Detailed timings:");
            log::info!("    • Picking: {}ms", timings.picking_ms);
            log::info!("    • Removal: {}ms", timings.removal_ms);
            log::info!("    • Persistence: {}ms", timings.persistence_ms);
            log::info!("    • Navigation: {}ms", timings.navigation_ms);
        }
    }

    fn on_failure(&self, stage: PipelineStage, failure: &PipelineFailure) {
        log::error!("❌ Error during {}: {}", stage.description(), failure);
    }

    fn on_cancelled(&self) {
        log::info!("Picker dismissed, nothing to do");
    }
}
