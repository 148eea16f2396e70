use thiserror::Error;

use crate::session::{SessionEvent, SessionState};

/// Reasons an upload never reaches the `Loaded` state
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("unsupported media type `{0}`, expected image/*")]
    UnsupportedType(String),

    #[error("image is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("failed to decode image: {0}")]
    Decode(String),
}

impl From<image::ImageError> for LoadError {
    fn from(err: image::ImageError) -> Self {
        LoadError::Decode(err.to_string())
    }
}

/// Why the last run ended in `Failed`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error("detection timed out")]
    Timeout,

    #[error("detection failed: {0}")]
    DetectionError(String),
}

/// Preconditions rejected by `run`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("no image loaded")]
    NoImage,

    #[error("a detection run is already in progress")]
    AlreadyProcessing,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot apply {event:?} while {from:?}")]
pub struct InvalidTransition {
    pub from: SessionState,
    pub event: SessionEvent,
}
