pub mod process;

use std::future::Future;

use crate::models::{DetectionOutput, RasterHandle};

pub use process::ProcessDetector;

/// The external rectangle-detection algorithm.
///
/// The returned future must own everything it needs: the orchestrator runs it
/// as its own task and may stop waiting on it without cancelling it.
pub trait Detector: Send + Sync + 'static {
    fn detect(
        &self,
        raster: RasterHandle,
    ) -> impl Future<Output = anyhow::Result<DetectionOutput>> + Send + 'static;

    /// Human-readable name (used in logs)
    fn name(&self) -> &str;
}
