//! Terminal spinner driven by pipeline status

use crate::error::PipelineFailure;
use crate::observer::{PipelineObserver, PipelineStage, PipelineStatus, PipelineTimings};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Spinner that ticks while the loading flag is raised
pub(crate) struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    pub(crate) fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { bar }
    }

    /// Follow status changes until the orchestrator goes away
    pub(crate) fn follow(&self, mut status: watch::Receiver<PipelineStatus>) -> JoinHandle<()> {
        let bar = self.bar.clone();
        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let loading = status.borrow_and_update().loading;
                if loading {
                    bar.enable_steady_tick(TICK_INTERVAL);
                } else {
                    bar.disable_steady_tick();
                }
            }
            if !bar.is_finished() {
                bar.finish_and_clear();
            }
        })
    }
}

impl PipelineObserver for SpinnerObserver {
    fn on_stage(&self, stage: PipelineStage) {
        self.bar
            .set_message(format!("[{}%] {}", stage.progress_percentage(), stage.description()));
    }

    fn on_completed(&self, timings: &PipelineTimings) {
        self.bar
            .finish_with_message(format!("✅ Cutout ready in {}ms", timings.total_ms));
    }

    fn on_failure(&self, _stage: PipelineStage, failure: &PipelineFailure) {
        self.bar
            .abandon_with_message(format!("❌ {}", failure.user_message()));
    }

    fn on_cancelled(&self) {
        self.bar.finish_and_clear();
    }
}
