//! Health status values and the health-check query kind.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_events::{Event, Query, Responder};

/// Health of one component, or of the agent as a whole.
///
/// Ordered from best to worst, with `Ignored` first: an ignored reply never
/// influences the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The component asked not to be counted.
    Ignored,
    /// Fully operational.
    Healthy,
    /// Operational with reduced capability.
    Degraded,
    /// Not operational.
    Unhealthy,
}

impl HealthStatus {
    /// Returns the lowercase name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Ignored => "ignored",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }

    /// Parses a status name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ignored" => Some(HealthStatus::Ignored),
            "healthy" | "ok" => Some(HealthStatus::Healthy),
            "degraded" => Some(HealthStatus::Degraded),
            "unhealthy" => Some(HealthStatus::Unhealthy),
            _ => None,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One component's answer to a health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckReply {
    /// Component name; replies are keyed by it.
    pub component: String,
    /// Reported status.
    pub status: HealthStatus,
    /// Free-form details (versions, counters, reasons).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extended_status: BTreeMap<String, String>,
    /// When the reply was produced.
    pub checked_at: DateTime<Utc>,
}

impl HealthCheckReply {
    /// Creates a reply stamped with the current time.
    pub fn new(component: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            component: component.into(),
            status,
            extended_status: BTreeMap::new(),
            checked_at: Utc::now(),
        }
    }

    /// Adds one extended status entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extended_status.insert(key.into(), value.into());
        self
    }
}

/// Query kind asking every registered component for its health.
#[derive(Debug, Clone, Default)]
pub struct HealthCheckEvent {
    /// Requester tag, carried into logs only.
    pub requested_by: Option<String>,
}

impl HealthCheckEvent {
    /// Creates an untagged health check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a health check tagged with its requester.
    pub fn tagged(requester: impl Into<String>) -> Self {
        Self {
            requested_by: Some(requester.into()),
        }
    }
}

impl Event for HealthCheckEvent {
    type Handler = dyn Responder<HealthCheckEvent>;
}

impl Query for HealthCheckEvent {
    type Response = HealthCheckReply;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(HealthStatus::Unhealthy > HealthStatus::Degraded);
        assert!(HealthStatus::Degraded > HealthStatus::Healthy);
        assert!(HealthStatus::Healthy > HealthStatus::Ignored);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(HealthStatus::parse("Healthy"), Some(HealthStatus::Healthy));
        assert_eq!(HealthStatus::parse("ok"), Some(HealthStatus::Healthy));
        assert_eq!(HealthStatus::parse("DEGRADED"), Some(HealthStatus::Degraded));
        assert_eq!(HealthStatus::parse("unhealthy"), Some(HealthStatus::Unhealthy));
        assert_eq!(HealthStatus::parse("ignored"), Some(HealthStatus::Ignored));
        assert_eq!(HealthStatus::parse("broken"), None);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&HealthStatus::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
    }

    #[test]
    fn test_reply_json_shape() {
        let reply = HealthCheckReply::new("ips", HealthStatus::Healthy).with_detail("team", "core");
        let value = serde_json::to_value(&reply).unwrap();

        assert_eq!(value["component"], "ips");
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["extendedStatus"]["team"], "core");
        assert!(value["checkedAt"].is_string());
    }

    #[test]
    fn test_reply_without_details_omits_extended_status() {
        let reply = HealthCheckReply::new("ips", HealthStatus::Healthy);
        let value = serde_json::to_value(&reply).unwrap();
        assert!(value.get("extendedStatus").is_none());
    }

    #[test]
    fn test_requested_by() {
        let event = HealthCheckEvent::tagged("cli");
        assert_eq!(event.requested_by.as_deref(), Some("cli"));
        assert!(HealthCheckEvent::new().requested_by.is_none());
    }
}
