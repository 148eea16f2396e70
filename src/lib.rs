pub mod comparator;
pub mod config;
pub mod detector;
pub mod error;
pub mod loader;
pub mod models;
pub mod notify;
pub mod overlay;
pub mod session;

pub use comparator::{RatioComparison, STANDARD_CARD_RATIO, compare};
pub use config::HarnessConfig;
pub use detector::{Detector, ProcessDetector};
pub use error::{FailureReason, InvalidTransition, LoadError, RunError};
pub use loader::{ImageFile, ImageLoader};
pub use models::{
    DetectedRectangle, DetectionDebugInfo, DetectionOutput, ProcessingStep, RasterHandle,
    UploadedImage,
};
pub use notify::{NotificationLevel, Notifier, SelectionPresenter};
pub use session::{DetectionOrchestrator, RunOutcome, SessionEvent, SessionState};
