use crate::error::{FailureReason, InvalidTransition};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loaded,
    Processing,
    Completed,
    Failed(FailureReason),
}

impl SessionState {
    pub fn is_processing(&self) -> bool {
        matches!(self, SessionState::Processing)
    }
}

/// Inputs to [`transition`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ImageLoaded,
    RunStarted,
    DetectionSucceeded,
    DetectionFailed(String),
    TimedOut,
    Reset,
}

/// Pure transition function for the session state machine.
///
/// A fresh image load and a reset are accepted from every state; a load while
/// `Processing` abandons the in-flight run. Runs start only with an image
/// present and never overlap. Settlement events are only valid while
/// `Processing`.
pub fn transition(
    state: &SessionState,
    event: SessionEvent,
) -> Result<SessionState, InvalidTransition> {
    use SessionState::*;

    let next = match (state, &event) {
        (_, SessionEvent::Reset) => Idle,
        (_, SessionEvent::ImageLoaded) => Loaded,
        (Loaded | Completed | Failed(_), SessionEvent::RunStarted) => Processing,
        (Processing, SessionEvent::DetectionSucceeded) => Completed,
        (Processing, SessionEvent::DetectionFailed(cause)) => {
            Failed(FailureReason::DetectionError(cause.clone()))
        }
        (Processing, SessionEvent::TimedOut) => Failed(FailureReason::Timeout),
        _ => {
            return Err(InvalidTransition {
                from: state.clone(),
                event: event.clone(),
            });
        }
    };
    Ok(next)
}
