//! Aggregated health reports and their crash-safe persistence.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HealthError, Result};
use crate::status::{HealthCheckReply, HealthStatus};

/// Result of one health check pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Aggregated status across all counted components.
    pub status: HealthStatus,
    /// Counted replies keyed by component name.
    #[serde(rename = "allComponentsHealthCheckReplies")]
    pub replies: BTreeMap<String, HealthCheckReply>,
    /// When the pass ran.
    pub generated_at: DateTime<Utc>,
}

impl HealthReport {
    /// Builds a report from counted replies, computing the aggregate.
    pub fn from_replies(replies: BTreeMap<String, HealthCheckReply>) -> Self {
        Self {
            status: aggregate(replies.values()),
            replies,
            generated_at: Utc::now(),
        }
    }

    /// Components reporting anything other than healthy.
    pub fn failing_components(&self) -> Vec<&str> {
        self.replies
            .values()
            .filter(|r| matches!(r.status, HealthStatus::Degraded | HealthStatus::Unhealthy))
            .map(|r| r.component.as_str())
            .collect()
    }
}

/// Folds component statuses into one.
///
/// Any `Unhealthy` reply makes the aggregate unhealthy; otherwise any
/// `Degraded` reply makes it degraded. `Ignored` replies never count.
pub fn aggregate<'a, I>(replies: I) -> HealthStatus
where
    I: IntoIterator<Item = &'a HealthCheckReply>,
{
    let mut status = HealthStatus::Healthy;
    for reply in replies {
        match reply.status {
            HealthStatus::Unhealthy => return HealthStatus::Unhealthy,
            HealthStatus::Degraded => status = HealthStatus::Degraded,
            HealthStatus::Healthy | HealthStatus::Ignored => {}
        }
    }
    status
}

/// Writes `report` as JSON to `path` atomically.
///
/// The JSON goes to a temporary file in the same directory which is then
/// renamed over the target, so readers never see a partial report.
pub fn write_report(path: &Path, report: &HealthReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| HealthError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let write_err = |source: std::io::Error| HealthError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    temp_file.write_all(json.as_bytes()).map_err(write_err)?;
    temp_file.flush().map_err(write_err)?;
    temp_file.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

/// Reads a report previously written by [`write_report`].
pub fn read_report(path: &Path) -> Result<HealthReport> {
    let data = fs::read_to_string(path).map_err(|source| HealthError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&data)?)
}
