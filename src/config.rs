use std::time::Duration;

/// Hard budget for one detection call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Pause before invoking the detector so `Processing` is observable first
pub const DEFAULT_START_DELAY: Duration = Duration::from_millis(100);

/// 15 MiB
pub const MAX_UPLOAD_BYTES: u64 = 15 * 1024 * 1024;

/// Tunables for one harness session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    pub timeout: Duration,
    pub start_delay: Duration,
    pub max_upload_bytes: u64,
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            start_delay: DEFAULT_START_DELAY,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_start_delay(mut self, start_delay: Duration) -> Self {
        self.start_delay = start_delay;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::new()
    }
}
