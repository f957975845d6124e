//! Bus configuration.

use std::time::Duration;

/// Configuration shared by every registry of a bus.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Handlers slower than this are reported with a warning. `None` disables
    /// the check.
    pub slow_handler_threshold: Option<Duration>,
    /// Whether contained handler faults are logged.
    pub log_faults: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            slow_handler_threshold: Some(Duration::from_millis(250)),
            log_faults: true,
        }
    }
}

impl BusConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the slow handler threshold.
    pub fn with_slow_handler_threshold(mut self, threshold: Duration) -> Self {
        self.slow_handler_threshold = Some(threshold);
        self
    }

    /// Disables the slow handler check.
    pub fn without_slow_handler_check(mut self) -> Self {
        self.slow_handler_threshold = None;
        self
    }

    /// Sets whether handler faults are logged.
    pub fn with_log_faults(mut self, log_faults: bool) -> Self {
        self.log_faults = log_faults;
        self
    }
}
