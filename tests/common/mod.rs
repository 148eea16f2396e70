mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from rectprobe for tests
pub use rectprobe::{
    DetectedRectangle, DetectionDebugInfo, DetectionOrchestrator, DetectionOutput,
    FailureReason, HarnessConfig, ImageFile, LoadError, NotificationLevel, ProcessingStep,
    RunError, RunOutcome, SessionState,
};
