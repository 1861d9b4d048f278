//! Test utilities and mock collaborators for orchestrator tests
//!
//! Every mock appends to a shared [`CallLog`] so tests can assert the exact
//! order in which the orchestrator reached its collaborators. Every mock can
//! also watch the orchestrator status and record the state and loading flag
//! it saw while it was being called.

use crate::{
    config::PickerOptions,
    error::{CutoutError, Result},
    navigation::{Navigator, ScreenTransition},
    observer::PipelineStatus,
    picker::ImagePicker,
    removal::BackgroundRemover,
    store::ArtifactStore,
    types::{
        CutoutPayload, ImageReference, PersistedCutout, PickerOutcome, PipelineState,
        RemovalOutcome,
    },
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Ordered record of collaborator calls shared between mocks
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record<S: Into<String>>(&self, entry: S) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Debug, Default)]
struct LoadingProbe {
    status: Mutex<Option<watch::Receiver<PipelineStatus>>>,
    seen: Mutex<Vec<PipelineStatus>>,
}

impl LoadingProbe {
    fn watch(&self, rx: watch::Receiver<PipelineStatus>) {
        *self.status.lock().unwrap() = Some(rx);
    }

    fn sample(&self) {
        let status = self.status.lock().unwrap().as_ref().map(|rx| *rx.borrow());
        if let Some(status) = status {
            self.seen.lock().unwrap().push(status);
        }
    }

    fn loading(&self) -> Vec<bool> {
        self.seen.lock().unwrap().iter().map(|s| s.loading).collect()
    }

    fn states(&self) -> Vec<PipelineState> {
        self.seen.lock().unwrap().iter().map(|s| s.state).collect()
    }
}

/// Picker that replays a fixed list of outcomes, then cancels
#[derive(Debug)]
pub struct MockPicker {
    outcomes: Mutex<VecDeque<PickerOutcome>>,
    should_fail: bool,
    probe: LoadingProbe,
    calls: CallLog,
}

impl MockPicker {
    pub fn new(outcomes: Vec<PickerOutcome>, calls: CallLog) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            should_fail: false,
            probe: LoadingProbe::default(),
            calls,
        }
    }

    /// Picker whose selection can never be delivered
    pub fn failing(calls: CallLog) -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            should_fail: true,
            probe: LoadingProbe::default(),
            calls,
        }
    }

    pub fn watch(&self, rx: watch::Receiver<PipelineStatus>) {
        self.probe.watch(rx);
    }

    pub fn loading_seen(&self) -> Vec<bool> {
        self.probe.loading()
    }

    pub fn states_seen(&self) -> Vec<PipelineState> {
        self.probe.states()
    }
}

#[async_trait]
impl ImagePicker for MockPicker {
    async fn pick(&self, _options: &PickerOptions) -> Result<PickerOutcome> {
        self.calls.record("pick");
        self.probe.sample();
        if self.should_fail {
            return Err(CutoutError::picker("selected file is unreadable"));
        }
        Ok(self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PickerOutcome::Cancelled))
    }
}

/// Scripted behavior for one removal call
#[derive(Debug, Clone)]
pub enum RemoverBehavior {
    /// Return this base64 payload
    Cutout(String),
    Empty,
    /// Fail with a network error carrying this text
    Fail(String),
    /// Never answer
    Hang,
}

#[derive(Debug)]
pub struct MockRemover {
    behaviors: Mutex<VecDeque<RemoverBehavior>>,
    call_count: AtomicU64,
    probe: LoadingProbe,
    calls: CallLog,
}

impl MockRemover {
    pub fn new(behaviors: Vec<RemoverBehavior>, calls: CallLog) -> Self {
        Self {
            behaviors: Mutex::new(behaviors.into()),
            call_count: AtomicU64::new(0),
            probe: LoadingProbe::default(),
            calls,
        }
    }

    pub fn watch(&self, rx: watch::Receiver<PipelineStatus>) {
        self.probe.watch(rx);
    }

    pub fn loading_seen(&self) -> Vec<bool> {
        self.probe.loading()
    }

    pub fn states_seen(&self) -> Vec<PipelineState> {
        self.probe.states()
    }

    pub fn calls(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackgroundRemover for MockRemover {
    async fn remove_background(&self, image: &ImageReference) -> Result<RemovalOutcome> {
        self.calls.record(format!("remove:{}", image));
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.probe.sample();

        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(RemoverBehavior::Empty);

        match behavior {
            RemoverBehavior::Cutout(b64) => Ok(RemovalOutcome::from_payload(CutoutPayload::new(b64))),
            RemoverBehavior::Empty => Ok(RemovalOutcome::Empty),
            RemoverBehavior::Fail(message) => {
                Err(CutoutError::network_error("Removal request failed", message))
            },
            RemoverBehavior::Hang => std::future::pending().await,
        }
    }
}

/// Store that hands out `U1`, `U2`, ... without touching the filesystem
#[derive(Debug)]
pub struct MockStore {
    next_id: AtomicU64,
    saves: Mutex<Vec<(String, String)>>,
    fail_next: Mutex<Option<String>>,
    probe: LoadingProbe,
    calls: CallLog,
}

impl MockStore {
    pub fn new(calls: CallLog) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            saves: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            probe: LoadingProbe::default(),
            calls,
        }
    }

    pub fn watch(&self, rx: watch::Receiver<PipelineStatus>) {
        self.probe.watch(rx);
    }

    pub fn fail_next<S: Into<String>>(&self, message: S) {
        *self.fail_next.lock().unwrap() = Some(message.into());
    }

    /// `(file_name, base64)` for every successful save
    pub fn saves(&self) -> Vec<(String, String)> {
        self.saves.lock().unwrap().clone()
    }

    pub fn loading_seen(&self) -> Vec<bool> {
        self.probe.loading()
    }

    pub fn states_seen(&self) -> Vec<PipelineState> {
        self.probe.states()
    }
}

#[async_trait]
impl ArtifactStore for MockStore {
    async fn save(&self, file_name: &str, payload: &CutoutPayload) -> Result<PersistedCutout> {
        self.calls
            .record(format!("save:{}:{}", file_name, payload.as_base64()));
        self.probe.sample();

        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(CutoutError::storage(message));
        }

        self.saves
            .lock()
            .unwrap()
            .push((file_name.to_string(), payload.as_base64().to_string()));
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        Ok(PersistedCutout {
            reference: ImageReference::new(format!("U{}", id)),
            path: PathBuf::from(file_name),
            size_bytes: payload.as_base64().len() as u64,
        })
    }
}

#[derive(Debug)]
pub struct MockNavigator {
    transitions: Mutex<Vec<(String, ScreenTransition)>>,
    fail_next: Mutex<Option<String>>,
    probe: LoadingProbe,
    calls: CallLog,
}

impl MockNavigator {
    pub fn new(calls: CallLog) -> Self {
        Self {
            transitions: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            probe: LoadingProbe::default(),
            calls,
        }
    }

    pub fn watch(&self, rx: watch::Receiver<PipelineStatus>) {
        self.probe.watch(rx);
    }

    pub fn fail_next<S: Into<String>>(&self, message: S) {
        *self.fail_next.lock().unwrap() = Some(message.into());
    }

    pub fn transitions(&self) -> Vec<(String, ScreenTransition)> {
        self.transitions.lock().unwrap().clone()
    }

    pub fn loading_seen(&self) -> Vec<bool> {
        self.probe.loading()
    }

    pub fn states_seen(&self) -> Vec<PipelineState> {
        self.probe.states()
    }
}

#[async_trait]
impl Navigator for MockNavigator {
    async fn navigate(&self, screen: &str, transition: &ScreenTransition) -> Result<()> {
        self.calls.record(format!(
            "navigate:{}:{}:{}",
            screen,
            transition.original_image(),
            transition.cutout_image()
        ));
        self.probe.sample();

        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(CutoutError::navigation(message));
        }

        self.transitions
            .lock()
            .unwrap()
            .push((screen.to_string(), transition.clone()));
        Ok(())
    }
}
