use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Decoded raster shared between the session and an in-flight detection call
pub type RasterHandle = Arc<DynamicImage>;

/// A candidate rectangle returned by the detection algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawRectangle")]
pub struct DetectedRectangle {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub confidence: f64,
    pub aspect_ratio: f64,
}

impl DetectedRectangle {
    pub fn new(x: i32, y: i32, width: u32, height: u32, confidence: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence: confidence.clamp(0.0, 1.0),
            aspect_ratio: ratio(width, height),
        }
    }

    /// Override the ratio reported by the algorithm (it may measure a rotated box)
    pub fn with_aspect_ratio(mut self, aspect_ratio: f64) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Get center coordinates
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }
}

fn ratio(width: u32, height: u32) -> f64 {
    if height == 0 {
        return 0.0;
    }
    width as f64 / height as f64
}

/// Wire shape accepted from detectors; `aspectRatio` is optional
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRectangle {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    #[serde(default)]
    confidence: f64,
    aspect_ratio: Option<f64>,
}

impl From<RawRectangle> for DetectedRectangle {
    fn from(raw: RawRectangle) -> Self {
        let rect = DetectedRectangle::new(raw.x, raw.y, raw.width, raw.height, raw.confidence);
        match raw.aspect_ratio {
            Some(aspect_ratio) => rect.with_aspect_ratio(aspect_ratio),
            None => rect,
        }
    }
}

/// One diagnostic record emitted by the detection algorithm.
/// The payload is opaque to the harness; only its position in the trace matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessingStep {
    pub payload: serde_json::Value,
}

impl ProcessingStep {
    pub fn new(payload: serde_json::Value) -> Self {
        Self { payload }
    }

    /// Best-effort label: a string payload, or its `name`/`step` field
    pub fn label(&self) -> Option<&str> {
        match &self.payload {
            serde_json::Value::String(s) => Some(s.as_str()),
            serde_json::Value::Object(map) => map
                .get("name")
                .or_else(|| map.get("step"))
                .and_then(|v| v.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionDebugInfo {
    #[serde(default)]
    pub processing_steps: Vec<ProcessingStep>,
}

impl DetectionDebugInfo {
    pub fn is_empty(&self) -> bool {
        self.processing_steps.is_empty()
    }
}

/// What a detector resolves with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionOutput {
    pub rectangles: Vec<DetectedRectangle>,
    #[serde(default)]
    pub debug_info: DetectionDebugInfo,
}

/// An image accepted by the loader, owned by the current session
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub source_name: String,
    pub size_bytes: u64,
    pub raster: RasterHandle,
    pub width: u32,
    pub height: u32,
}
