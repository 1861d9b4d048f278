//! Acquisition orchestrator
//!
//! Screen-level state machine that drives one pipeline run:
//!
//! ```text
//! Idle ──pick──▶ Picking ──cancel──▶ Idle
//!                   │
//!                select
//!                   ▼
//!              Processing ──removal/persistence/navigation fails──▶ Failed ──▶ Idle
//!                   │
//!          transition delivered
//!                   ▼
//!              Succeeded
//! ```
//!
//! Each step is awaited in order: persistence never starts before removal
//! produced a payload, and the transition never fires before persistence
//! returned a reference. Failures are absorbed here and reported as a
//! [`PipelineOutcome::Failed`]; nothing is retried.
//!
//! The loading flag is derived from the state (`loading == (state ==
//! Processing)`) and every run holds a guard that puts the machine back to
//! `Idle` if the run future is dropped before reaching a terminal state.

use crate::{
    config::PipelineConfig,
    error::{FailureKind, PipelineFailure, Result},
    navigation::{Navigator, ScreenTransition},
    observer::{NoOpObserver, PipelineObserver, PipelineStage, PipelineStatus, PipelineTimings},
    picker::ImagePicker,
    removal::BackgroundRemover,
    store::ArtifactStore,
    tracing_config::{events, spans},
    types::{CutoutPayload, ImageReference, PersistedCutout, PickerOutcome, PipelineState, RemovalOutcome},
};
use instant::Instant;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;

/// Everything a successful run produced
#[derive(Debug, Clone)]
pub struct CompletedRun {
    /// Payload delivered to the target screen
    pub transition: ScreenTransition,
    /// Where the cutout was written
    pub persisted: PersistedCutout,
    pub timings: PipelineTimings,
}

/// Terminal result of `pick_and_process`
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// Picker dismissed; nothing happened
    Cancelled,
    Completed(CompletedRun),
    /// Recoverable failure; the orchestrator is idle again
    Failed(PipelineFailure),
}

impl PipelineOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    #[must_use]
    pub fn transition(&self) -> Option<&ScreenTransition> {
        match self {
            Self::Completed(run) => Some(&run.transition),
            _ => None,
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&PipelineFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

fn publish(status: &watch::Sender<PipelineStatus>, state: PipelineState) {
    status.send_replace(PipelineStatus {
        state,
        loading: state == PipelineState::Processing,
    });
    tracing::trace!(state = %state, "Pipeline state changed");
}

/// Keeps the state machine honest for the lifetime of one run
///
/// Dropping an unfinished guard (cancelled future, panic) releases the
/// loading flag and returns to `Idle`.
struct RunGuard {
    status: Arc<watch::Sender<PipelineStatus>>,
    finished: bool,
}

impl RunGuard {
    fn begin(status: Arc<watch::Sender<PipelineStatus>>) -> Self {
        publish(&status, PipelineState::Picking);
        Self {
            status,
            finished: false,
        }
    }

    fn processing(&self) {
        publish(&self.status, PipelineState::Processing);
    }

    fn cancel(mut self) {
        publish(&self.status, PipelineState::Idle);
        self.finished = true;
    }

    fn succeed(mut self) {
        publish(&self.status, PipelineState::Succeeded);
        self.finished = true;
    }

    fn fail(mut self) {
        publish(&self.status, PipelineState::Failed);
        publish(&self.status, PipelineState::Idle);
        self.finished = true;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("Pipeline run abandoned before completion; returning to idle");
            publish(&self.status, PipelineState::Idle);
        }
    }
}

/// Drives picking, background removal, persistence and the editor handoff
pub struct AcquisitionOrchestrator {
    config: PipelineConfig,
    picker: Arc<dyn ImagePicker>,
    remover: Arc<dyn BackgroundRemover>,
    store: Arc<dyn ArtifactStore>,
    navigator: Arc<dyn Navigator>,
    observer: Arc<dyn PipelineObserver>,
    status: Arc<watch::Sender<PipelineStatus>>,
    selected_image: Option<ImageReference>,
    cutout: Option<CutoutPayload>,
    last_failure: Option<PipelineFailure>,
    runs: u64,
}

impl AcquisitionOrchestrator {
    /// Create an idle orchestrator
    ///
    /// # Errors
    /// - Invalid pipeline configuration
    pub fn new(
        config: PipelineConfig,
        picker: Arc<dyn ImagePicker>,
        remover: Arc<dyn BackgroundRemover>,
        store: Arc<dyn ArtifactStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        config.validate()?;
        let (status, _) = watch::channel(PipelineStatus::default());

        Ok(Self {
            config,
            picker,
            remover,
            store,
            navigator,
            observer: Arc::new(NoOpObserver),
            status: Arc::new(status),
            selected_image: None,
            cutout: None,
            last_failure: None,
            runs: 0,
        })
    }

    /// Attach an observer for stage and outcome notifications
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.status.borrow().state
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status.borrow().loading
    }

    /// Follow state and loading changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PipelineStatus> {
        self.status.subscribe()
    }

    /// Image chosen in the current (or last) run
    #[must_use]
    pub fn selected_image(&self) -> Option<&ImageReference> {
        self.selected_image.as_ref()
    }

    /// Cutout received in the current run, for on-screen preview only
    #[must_use]
    pub fn cutout_preview(&self) -> Option<&CutoutPayload> {
        self.cutout.as_ref()
    }

    #[must_use]
    pub fn last_failure(&self) -> Option<&PipelineFailure> {
        self.last_failure.as_ref()
    }

    /// Drop any per-run state and return to `Idle`
    pub fn reset(&mut self) {
        self.selected_image = None;
        self.cutout = None;
        self.last_failure = None;
        publish(&self.status, PipelineState::Idle);
    }

    /// Run the full pipeline once
    ///
    /// Never returns an error: cancellation and failures are reported through
    /// [`PipelineOutcome`] and leave the orchestrator ready for another run.
    pub async fn pick_and_process(&mut self) -> PipelineOutcome {
        self.runs += 1;
        let span = spans::pipeline_run(self.runs);
        self.run().instrument(span).await
    }

    async fn run(&mut self) -> PipelineOutcome {
        let started = Instant::now();
        self.last_failure = None;

        let guard = RunGuard::begin(Arc::clone(&self.status));
        self.observer.on_stage(PipelineStage::Picking);

        let options = self.config.picker_options();
        let selected = match self.picker.pick(&options).await {
            Ok(PickerOutcome::Selected(image)) => image,
            Ok(PickerOutcome::Cancelled) => {
                tracing::info!("Picker dismissed without a selection");
                guard.cancel();
                self.observer.on_cancelled();
                return PipelineOutcome::Cancelled;
            },
            Err(e) => {
                let failure = PipelineFailure::from_error(FailureKind::PickerFailed, &e);
                return self.fail(guard, PipelineStage::Picking, failure);
            },
        };
        let picking_ms = started.elapsed().as_millis() as u64;

        tracing::info!(image = %selected, "Image selected");
        self.selected_image = Some(selected.clone());
        self.cutout = None;
        guard.processing();

        // Remote removal
        self.observer.on_stage(PipelineStage::Removing);
        let stage_start = Instant::now();
        let payload = match self.remove_background(&selected).await {
            Ok(payload) => payload,
            Err(failure) => return self.fail(guard, PipelineStage::Removing, failure),
        };
        let removal_ms = stage_start.elapsed().as_millis() as u64;
        self.cutout = Some(payload.clone());

        // Local persistence
        self.observer.on_stage(PipelineStage::Persisting);
        let stage_start = Instant::now();
        let persisted = match self.store.save(&self.config.cutout_file_name, &payload).await {
            Ok(persisted) => persisted,
            Err(e) => {
                let failure = PipelineFailure::from_error(FailureKind::PersistenceFailed, &e);
                return self.fail(guard, PipelineStage::Persisting, failure);
            },
        };
        let persistence_ms = stage_start.elapsed().as_millis() as u64;

        // Screen handoff
        self.observer.on_stage(PipelineStage::Navigating);
        let stage_start = Instant::now();
        let transition = ScreenTransition::new(selected, &persisted);
        if let Err(e) = self
            .navigator
            .navigate(&self.config.target_screen, &transition)
            .await
        {
            let failure = PipelineFailure::from_error(FailureKind::NavigationFailed, &e);
            return self.fail(guard, PipelineStage::Navigating, failure);
        }
        let navigation_ms = stage_start.elapsed().as_millis() as u64;

        guard.succeed();

        let timings = PipelineTimings {
            picking_ms,
            removal_ms,
            persistence_ms,
            navigation_ms,
            total_ms: started.elapsed().as_millis() as u64,
        };
        self.observer.on_stage(PipelineStage::Completed);
        self.observer.on_completed(&timings);

        tracing::info!(
            original = %transition.original_image(),
            cutout = %transition.cutout_image(),
            screen = %self.config.target_screen,
            "Cutout pipeline completed"
        );
        events::performance_metric("background_removal", timings.removal_ms);
        events::performance_metric("persistence", timings.persistence_ms);
        events::performance_metric("navigation", timings.navigation_ms);
        events::performance_metric("pipeline_run", timings.total_ms);

        PipelineOutcome::Completed(CompletedRun {
            transition,
            persisted,
            timings,
        })
    }

    /// Call the remover, applying the optional timeout and mapping empty results
    async fn remove_background(
        &self,
        image: &ImageReference,
    ) -> std::result::Result<CutoutPayload, PipelineFailure> {
        let call = self.remover.remove_background(image);

        let result = match self.config.removal_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(PipelineFailure::new(
                        FailureKind::RemovalFailed,
                        format!("removal service did not answer within {:?}", limit),
                    ))
                },
            },
            None => call.await,
        };

        match result {
            Ok(RemovalOutcome::Cutout(payload)) => Ok(payload),
            Ok(RemovalOutcome::Empty) => Err(PipelineFailure::new(
                FailureKind::RemovalFailed,
                "removal service returned an empty payload",
            )),
            Err(e) => Err(PipelineFailure::from_error(FailureKind::RemovalFailed, &e)),
        }
    }

    fn fail(
        &mut self,
        guard: RunGuard,
        stage: PipelineStage,
        failure: PipelineFailure,
    ) -> PipelineOutcome {
        tracing::error!(
            kind = %failure.kind,
            stage = stage.description(),
            error = %failure.message,
            "Cutout pipeline failed; ready for retry"
        );
        guard.fail();
        self.observer.on_failure(stage, &failure);
        self.last_failure = Some(failure.clone());
        PipelineOutcome::Failed(failure)
    }
}
