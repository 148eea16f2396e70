mod state;
mod store;

pub use state::{SessionEvent, SessionState, transition};
pub use store::ResultStore;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::comparator::{self, RatioComparison};
use crate::config::HarnessConfig;
use crate::detector::Detector;
use crate::error::{FailureReason, LoadError, RunError};
use crate::loader::{ImageFile, ImageLoader, ImageSlot};
use crate::models::{
    DetectedRectangle, DetectionDebugInfo, DetectionOutput, RasterHandle, UploadedImage,
};
use crate::notify::{
    LoggingPresenter, NotificationLevel, Notifier, SelectionPresenter, TracingNotifier,
};

/// How a call to [`DetectionOrchestrator::run`] ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed { rectangles: usize },
    Failed(FailureReason),
    /// Superseded by a reset or a new image before it settled
    Discarded,
}

/// First-settled result of the detection/timer race
enum Settlement {
    Detected(DetectionOutput),
    DetectionFailed(String),
    TimedOut,
}

impl Settlement {
    fn from_join(joined: Result<anyhow::Result<DetectionOutput>, JoinError>) -> Self {
        match joined {
            Ok(Ok(output)) => Settlement::Detected(output),
            Ok(Err(err)) => Settlement::DetectionFailed(format!("{err:#}")),
            Err(err) => Settlement::DetectionFailed(format!("detection task aborted: {err}")),
        }
    }
}

#[derive(Debug, Default)]
struct SessionInner {
    state: SessionState,
    image: ImageSlot,
    results: ResultStore,
    /// The only run allowed to settle. Cleared by whichever branch settles
    /// first, and by reset or a new load.
    in_flight: Option<Uuid>,
}

/// Side effects collected under the lock and dispatched after it is released
#[derive(Default)]
struct Effects {
    notice: Option<(NotificationLevel, String)>,
    selection_cleared: bool,
}

/// Drives one harness session: load an image, race the detector against the
/// timeout, keep the results and the operator's selection.
pub struct DetectionOrchestrator<D: Detector> {
    detector: Arc<D>,
    loader: ImageLoader,
    config: HarnessConfig,
    inner: Arc<Mutex<SessionInner>>,
    state_tx: Arc<watch::Sender<SessionState>>,
    notifier: Arc<dyn Notifier>,
    presenter: Arc<dyn SelectionPresenter>,
}

impl<D: Detector> Clone for DetectionOrchestrator<D> {
    fn clone(&self) -> Self {
        Self {
            detector: Arc::clone(&self.detector),
            loader: self.loader,
            config: self.config,
            inner: Arc::clone(&self.inner),
            state_tx: Arc::clone(&self.state_tx),
            notifier: Arc::clone(&self.notifier),
            presenter: Arc::clone(&self.presenter),
        }
    }
}

impl<D: Detector> DetectionOrchestrator<D> {
    pub fn new(detector: D, config: HarnessConfig) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            detector: Arc::new(detector),
            loader: ImageLoader::new(config.max_upload_bytes),
            config,
            inner: Arc::new(Mutex::new(SessionInner::default())),
            state_tx: Arc::new(state_tx),
            notifier: Arc::new(TracingNotifier),
            presenter: Arc::new(LoggingPresenter),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_presenter(mut self, presenter: Arc<dyn SelectionPresenter>) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// Observe every published state transition
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Current image; the clone shares (and keeps alive) the raster
    pub fn image(&self) -> Option<UploadedImage> {
        self.lock().image.current().cloned()
    }

    pub fn rectangles(&self) -> Vec<DetectedRectangle> {
        self.lock().results.rectangles().to_vec()
    }

    pub fn debug_info(&self) -> DetectionDebugInfo {
        self.lock().results.debug_info().clone()
    }

    pub fn selection(&self) -> Option<DetectedRectangle> {
        self.lock().results.selection().cloned()
    }

    /// Ratio comparison for the selected rectangle, if any
    pub fn compare_selection(&self) -> Option<RatioComparison> {
        self.lock().results.selection().map(comparator::compare)
    }

    /// Validate, decode and install a new image.
    ///
    /// On failure the session is left as it was. On success the previous
    /// raster is released, any results are dropped, and an in-flight run is
    /// abandoned (its result will be discarded).
    pub async fn load(&self, file: ImageFile) -> Result<(), LoadError> {
        let name = file.name.clone();
        let image = match self.loader.load(file).await {
            Ok(image) => image,
            Err(err) => {
                warn!(source = %name, error = %err, "rejected upload");
                self.notifier
                    .notify(NotificationLevel::Error, &format!("Could not load {name}: {err}"));
                return Err(err);
            }
        };

        let mut effects = Effects {
            notice: Some((
                NotificationLevel::Success,
                format!("Loaded {} ({}x{})", image.source_name, image.width, image.height),
            )),
            ..Default::default()
        };
        {
            let mut inner = self.lock();
            if let Some(run_id) = inner.in_flight.take() {
                info!(%run_id, "new image loaded while processing, abandoning run");
            }
            effects.selection_cleared = inner.results.clear();
            inner.image.install(image);
            self.advance(&mut inner, SessionEvent::ImageLoaded);
        }
        self.dispatch(effects);
        Ok(())
    }

    /// Run the detector once against the current image, racing it against
    /// the configured timeout.
    ///
    /// The race runs on its own task: if the returned future is dropped, the
    /// run still settles and the session leaves `Processing`.
    pub async fn run(&self) -> Result<RunOutcome, RunError> {
        let (run_id, raster, selection_cleared) = {
            let mut inner = self.lock();
            if inner.state.is_processing() {
                return Err(RunError::AlreadyProcessing);
            }
            let raster = match inner.image.current() {
                Some(image) => Arc::clone(&image.raster),
                None => return Err(RunError::NoImage),
            };
            let next = transition(&inner.state, SessionEvent::RunStarted)
                .map_err(|_| RunError::NoImage)?;
            self.publish(&mut inner, next);

            let run_id = Uuid::new_v4();
            inner.in_flight = Some(run_id);
            (run_id, raster, inner.results.clear())
        };
        self.dispatch(Effects {
            notice: Some((NotificationLevel::Info, "Detection started".to_string())),
            selection_cleared,
        });
        info!(%run_id, detector = self.detector.name(), "detection started");

        // The race owns its timer and settles on its own, so dropping the
        // caller's future never strands the session in Processing.
        let race = tokio::spawn(self.clone().race(run_id, raster));
        let outcome = match race.await {
            Ok(outcome) => outcome,
            Err(err) => self.settle(
                run_id,
                Settlement::DetectionFailed(format!("detection task aborted: {err}")),
            ),
        };
        Ok(outcome)
    }

    /// Detection against the timer, then settlement of whichever came first
    async fn race(self, run_id: Uuid, raster: RasterHandle) -> RunOutcome {
        let detector = Arc::clone(&self.detector);
        let start_delay = self.config.start_delay;
        let mut detection = tokio::spawn(async move {
            if !start_delay.is_zero() {
                tokio::time::sleep(start_delay).await;
            }
            detector.detect(raster).await
        });

        let timer = tokio::time::sleep(self.config.timeout);
        tokio::pin!(timer);

        let settlement = tokio::select! {
            biased;
            joined = &mut detection => Settlement::from_join(joined),
            () = &mut timer => Settlement::TimedOut,
        };
        let timed_out = matches!(settlement, Settlement::TimedOut);
        let outcome = self.settle(run_id, settlement);
        if timed_out {
            self.discard_when_done(run_id, detection);
        }
        outcome
    }

    /// Select `rectangle` if it belongs to the current results
    pub fn select(&self, rectangle: &DetectedRectangle) -> bool {
        let accepted = self.lock().results.select(rectangle);
        if accepted {
            self.presenter.selection_changed(Some(rectangle));
        } else {
            debug!("ignoring selection outside the current results");
        }
        accepted
    }

    pub fn clear_selection(&self) {
        let cleared = self.lock().results.clear_selection();
        if cleared {
            self.presenter.selection_changed(None);
        }
    }

    /// Back to `Idle` from any state, releasing the image and all results
    pub fn reset(&self) {
        let selection_cleared = {
            let mut inner = self.lock();
            if let Some(run_id) = inner.in_flight.take() {
                info!(%run_id, "reset while processing, late result will be discarded");
            }
            let cleared = inner.results.clear();
            inner.image.release();
            self.advance(&mut inner, SessionEvent::Reset);
            cleared
        };
        self.dispatch(Effects {
            notice: None,
            selection_cleared,
        });
    }

    /// Apply the race winner, unless the run was superseded
    fn settle(&self, run_id: Uuid, settlement: Settlement) -> RunOutcome {
        let mut inner = self.lock();
        if inner.in_flight != Some(run_id) {
            debug!(%run_id, "discarding settlement of a superseded run");
            return RunOutcome::Discarded;
        }
        inner.in_flight = None;

        let (outcome, notice) = match settlement {
            Settlement::Detected(output) => {
                let count = output.rectangles.len();
                self.advance(&mut inner, SessionEvent::DetectionSucceeded);
                inner.results.install(output);
                info!(%run_id, rectangles = count, "detection completed");
                let notice = if count == 0 {
                    (NotificationLevel::Info, "No rectangles found".to_string())
                } else {
                    (NotificationLevel::Success, format!("Found {count} rectangle(s)"))
                };
                (RunOutcome::Completed { rectangles: count }, notice)
            }
            Settlement::DetectionFailed(cause) => {
                self.advance(&mut inner, SessionEvent::DetectionFailed(cause.clone()));
                warn!(%run_id, %cause, "detection failed");
                let notice = (NotificationLevel::Error, format!("Detection failed: {cause}"));
                (RunOutcome::Failed(FailureReason::DetectionError(cause)), notice)
            }
            Settlement::TimedOut => {
                self.advance(&mut inner, SessionEvent::TimedOut);
                let timeout_ms = self.config.timeout.as_millis() as u64;
                warn!(%run_id, timeout_ms, "detection timed out");
                let notice = (
                    NotificationLevel::Error,
                    format!(
                        "Detection timed out after {:.1}s",
                        self.config.timeout.as_secs_f64()
                    ),
                );
                (RunOutcome::Failed(FailureReason::Timeout), notice)
            }
        };
        drop(inner);

        self.dispatch(Effects {
            notice: Some(notice),
            selection_cleared: false,
        });
        outcome
    }

    /// The detector is not cancelled on timeout; route its eventual result
    /// through the settle guard so it is dropped there.
    fn discard_when_done(
        &self,
        run_id: Uuid,
        detection: JoinHandle<anyhow::Result<DetectionOutput>>,
    ) {
        let session = self.clone();
        tokio::spawn(async move {
            let late = Settlement::from_join(detection.await);
            session.settle(run_id, late);
        });
    }

    /// Apply an event that is valid by construction at the call site
    fn advance(&self, inner: &mut SessionInner, event: SessionEvent) {
        match transition(&inner.state, event) {
            Ok(next) => self.publish(inner, next),
            Err(err) => warn!(error = %err, "ignored invalid session transition"),
        }
    }

    fn publish(&self, inner: &mut SessionInner, next: SessionState) {
        debug!(from = ?inner.state, to = ?next, "session transition");
        inner.state = next.clone();
        self.state_tx.send_replace(next);
    }

    fn dispatch(&self, effects: Effects) {
        if let Some((level, message)) = effects.notice {
            self.notifier.notify(level, &message);
        }
        if effects.selection_cleared {
            self.presenter.selection_changed(None);
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
