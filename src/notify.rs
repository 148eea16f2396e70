use tracing::{debug, error, info};

use crate::models::DetectedRectangle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// Receives operator-facing messages (toasts in a UI, log lines in the CLI)
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotificationLevel, message: &str);
}

/// Forwards notifications to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Info => info!("{message}"),
            NotificationLevel::Success => info!(success = true, "{message}"),
            NotificationLevel::Error => error!("{message}"),
        }
    }
}

/// Consumer of selection changes, e.g. the overlay renderer
pub trait SelectionPresenter: Send + Sync {
    fn selection_changed(&self, selection: Option<&DetectedRectangle>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPresenter;

impl SelectionPresenter for LoggingPresenter {
    fn selection_changed(&self, selection: Option<&DetectedRectangle>) {
        match selection {
            Some(r) => debug!(x = r.x, y = r.y, width = r.width, height = r.height, "selected rectangle"),
            None => debug!("selection cleared"),
        }
    }
}
