use image::{ImageBuffer, ImageFormat, Rgb};
use std::future::Future;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rectprobe::{
    DetectedRectangle, DetectionDebugInfo, DetectionOrchestrator, DetectionOutput, Detector,
    HarnessConfig, ImageFile, NotificationLevel, Notifier, ProcessingStep, RasterHandle,
    SelectionPresenter,
};

pub const MIB: usize = 1024 * 1024;

/// Encodes a small solid-colour PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |_, _| Rgb([255u8, 0u8, 0u8]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

pub fn png_file(name: &str, width: u32, height: u32) -> ImageFile {
    ImageFile::new(name, "image/png", png_bytes(width, height))
}

/// Encodes a PNG padded with a private ancillary chunk of `padding` bytes,
/// the way metadata-heavy camera exports look. Decoders skip the chunk.
pub fn padded_png(width: u32, height: u32, padding: usize) -> Vec<u8> {
    let png = png_bytes(width, height);
    // IEND is always the trailing 12 bytes
    let (body, iend) = png.split_at(png.len() - 12);

    let mut chunk = Vec::with_capacity(padding + 4);
    chunk.extend_from_slice(b"prVt");
    chunk.resize(padding + 4, 0x5A);

    let mut out = Vec::with_capacity(png.len() + padding + 12);
    out.extend_from_slice(body);
    out.extend_from_slice(&(padding as u32).to_be_bytes());
    out.extend_from_slice(&chunk);
    out.extend_from_slice(&crc32(&chunk).to_be_bytes());
    out.extend_from_slice(iend);
    out
}

/// CRC-32 over chunk type and data, as the PNG chunk layout requires
/// (ISO 3309 polynomial, reflected).
fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &b in bytes {
        crc ^= b as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

/// Three candidates in a deliberate non-sorted order, plus two trace steps.
pub fn card_output() -> DetectionOutput {
    DetectionOutput {
        rectangles: vec![
            DetectedRectangle::new(12, 30, 100, 100, 0.55),
            DetectedRectangle::new(40, 20, 250, 350, 0.93),
            DetectedRectangle::new(0, 0, 60, 20, 0.71),
        ],
        debug_info: DetectionDebugInfo {
            processing_steps: vec![
                ProcessingStep::new(serde_json::json!({"name": "threshold", "value": 128})),
                ProcessingStep::new(serde_json::json!({"name": "contours", "found": 3})),
            ],
        },
    }
}

/// Detector that answers with a fixed response after a fixed delay.
#[derive(Clone)]
pub struct ScriptedDetector {
    delay: Duration,
    response: Result<DetectionOutput, String>,
    calls: Arc<AtomicUsize>,
    finished: Arc<AtomicUsize>,
}

impl ScriptedDetector {
    pub fn succeeding(output: DetectionOutput, delay: Duration) -> Self {
        Self {
            delay,
            response: Ok(output),
            calls: Arc::new(AtomicUsize::new(0)),
            finished: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: &str, delay: Duration) -> Self {
        Self {
            response: Err(message.to_string()),
            ..Self::succeeding(DetectionOutput::default(), delay)
        }
    }

    /// Number of times `detect` was invoked
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    /// Number of invocations that ran to completion
    pub fn finished(&self) -> Arc<AtomicUsize> {
        self.finished.clone()
    }
}

impl Detector for ScriptedDetector {
    fn detect(
        &self,
        _raster: RasterHandle,
    ) -> impl Future<Output = anyhow::Result<DetectionOutput>> + Send + 'static {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay;
        let response = self.response.clone();
        let finished = self.finished.clone();
        async move {
            tokio::time::sleep(delay).await;
            finished.fetch_add(1, Ordering::SeqCst);
            response.map_err(anyhow::Error::msg)
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Detector whose future panics after `delay`.
pub struct PanickingDetector {
    delay: Duration,
}

impl PanickingDetector {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

fn explode() -> anyhow::Result<DetectionOutput> {
    panic!("contour tracer blew up")
}

impl Detector for PanickingDetector {
    fn detect(
        &self,
        _raster: RasterHandle,
    ) -> impl Future<Output = anyhow::Result<DetectionOutput>> + Send + 'static {
        let delay = self.delay;
        async move {
            tokio::time::sleep(delay).await;
            explode()
        }
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(NotificationLevel, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(NotificationLevel, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn contains(&self, level: NotificationLevel, needle: &str) -> bool {
        self.messages()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    calls: Mutex<Vec<Option<DetectedRectangle>>>,
}

impl RecordingPresenter {
    pub fn calls(&self) -> Vec<Option<DetectedRectangle>> {
        self.calls.lock().unwrap().clone()
    }
}

impl SelectionPresenter for RecordingPresenter {
    fn selection_changed(&self, selection: Option<&DetectedRectangle>) {
        self.calls.lock().unwrap().push(selection.cloned());
    }
}

/// A session wired to recording collaborators.
pub struct Harness {
    pub session: DetectionOrchestrator<ScriptedDetector>,
    pub notifier: Arc<RecordingNotifier>,
    pub presenter: Arc<RecordingPresenter>,
    pub calls: Arc<AtomicUsize>,
    pub finished: Arc<AtomicUsize>,
}

pub fn harness(detector: ScriptedDetector) -> Harness {
    harness_with_config(detector, HarnessConfig::default())
}

pub fn harness_with_config(detector: ScriptedDetector, config: HarnessConfig) -> Harness {
    let notifier = Arc::new(RecordingNotifier::default());
    let presenter = Arc::new(RecordingPresenter::default());
    let calls = detector.calls();
    let finished = detector.finished();
    let session = DetectionOrchestrator::new(detector, config)
        .with_notifier(notifier.clone())
        .with_presenter(presenter.clone());
    Harness {
        session,
        notifier,
        presenter,
        calls,
        finished,
    }
}

/// Session with `card_output()` answered after `delay` and an image already loaded.
pub async fn loaded_harness(delay: Duration) -> Harness {
    let h = harness(ScriptedDetector::succeeding(card_output(), delay));
    h.session
        .load(png_file("cards.png", 64, 48))
        .await
        .expect("Failed to load test image");
    h
}
