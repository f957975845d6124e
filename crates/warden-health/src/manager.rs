//! HealthCheckManager - collects component health over the event bus.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};
use warden_events::EventBus;

use crate::config::HealthCheckConfig;
use crate::error::{HealthError, Result};
use crate::report::{write_report, HealthReport};
use crate::status::{HealthCheckEvent, HealthCheckReply, HealthStatus};

/// Queries every registered component and aggregates the answers.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use warden_events::EventBus;
/// use warden_health::{ComponentHealth, HealthCheckManager, HealthStatus};
///
/// let bus = Arc::new(EventBus::new());
/// let ips = ComponentHealth::register(&bus, "ips");
/// let waap = ComponentHealth::register(&bus, "waap");
/// waap.set_status(HealthStatus::Degraded);
///
/// let manager = HealthCheckManager::new(Arc::clone(&bus));
/// let report = manager.run_check();
/// assert_eq!(report.status, HealthStatus::Degraded);
/// assert_eq!(report.replies.len(), 2);
/// # drop(ips);
/// ```
pub struct HealthCheckManager {
    bus: Arc<EventBus>,
    config: HealthCheckConfig,
}

impl HealthCheckManager {
    /// Creates a manager with default configuration.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self::with_config(bus, HealthCheckConfig::default())
    }

    /// Creates a manager with the given configuration.
    pub fn with_config(bus: Arc<EventBus>, config: HealthCheckConfig) -> Self {
        Self { bus, config }
    }

    /// This manager's configuration.
    pub fn config(&self) -> &HealthCheckConfig {
        &self.config
    }

    /// Queries all components, keyed by component name.
    ///
    /// `Ignored` replies are dropped when `skip_ignored` is set. If two
    /// components report the same name, the earlier registration's reply is kept.
    pub fn collect(&self) -> BTreeMap<String, HealthCheckReply> {
        if self.bus.is_empty::<HealthCheckEvent>() {
            debug!("no health responders registered");
            return BTreeMap::new();
        }

        let replies = self.bus.query(&HealthCheckEvent::tagged("health-check-manager"));
        let mut by_component = BTreeMap::new();
        for reply in replies {
            if self.config.skip_ignored && reply.status == HealthStatus::Ignored {
                trace!(component = %reply.component, "ignoring reply");
                continue;
            }
            by_component
                .entry(reply.component.clone())
                .or_insert(reply);
        }
        by_component
    }

    /// Runs one health check pass.
    pub fn run_check(&self) -> HealthReport {
        let report = HealthReport::from_replies(self.collect());
        for (component, reply) in &report.replies {
            trace!(component = %component, status = %reply.status, "component health");
        }
        debug!(
            status = %report.status,
            components = report.replies.len(),
            "health check completed"
        );
        report
    }

    /// Aggregated status of a fresh pass.
    pub fn aggregated_status(&self) -> HealthStatus {
        self.run_check().status
    }

    /// Each responder's status attributed to its listener name.
    pub fn named_statuses(&self) -> Vec<(String, HealthStatus)> {
        self.bus
            .named_query(&HealthCheckEvent::tagged("health-check-manager"))
            .into_iter()
            .map(|(name, reply)| (name, reply.status))
            .collect()
    }

    /// Runs a pass and writes it to `path`.
    pub fn write_report_to(&self, path: &Path) -> Result<HealthReport> {
        let report = self.run_check();
        write_report(path, &report)?;
        info!(path = %path.display(), status = %report.status, "health report written");
        Ok(report)
    }

    /// Runs a pass and writes it to the configured report path.
    pub fn persist_report(&self) -> Result<HealthReport> {
        let path = self.config.report_path.clone().ok_or(HealthError::NoReportPath)?;
        self.write_report_to(&path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "failed to write health report");
            e
        })
    }
}
