//! Health check manager configuration.

use std::path::PathBuf;

/// Configuration for [`HealthCheckManager`](crate::HealthCheckManager).
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// Where `persist_report` writes. `None` disables persistence.
    pub report_path: Option<PathBuf>,
    /// Drop replies whose status is `Ignored` before aggregating.
    pub skip_ignored: bool,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            report_path: None,
            skip_ignored: true,
        }
    }
}

impl HealthCheckConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the report path.
    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// Sets whether ignored replies are dropped.
    pub fn with_skip_ignored(mut self, skip: bool) -> Self {
        self.skip_ignored = skip;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HealthCheckConfig::default();
        assert!(config.report_path.is_none());
        assert!(config.skip_ignored);
    }

    #[test]
    fn test_config_builder() {
        let config = HealthCheckConfig::new()
            .with_report_path("/tmp/health.json")
            .with_skip_ignored(false);

        assert_eq!(config.report_path, Some(PathBuf::from("/tmp/health.json")));
        assert!(!config.skip_ignored);
    }
}
