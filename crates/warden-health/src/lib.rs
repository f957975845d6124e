//! Health checks for Warden components, built on the event bus.
//!
//! Components answer [`HealthCheckEvent`] queries; the
//! [`HealthCheckManager`] collects the answers and folds them into one
//! [`HealthStatus`]:
//! - **status**: status values, replies and the query kind
//! - **component**: [`ComponentHealth`], a settable responder
//! - **manager**: collection and aggregation
//! - **report**: aggregated reports and atomic JSON persistence

pub mod component;
pub mod config;
pub mod error;
pub mod manager;
pub mod report;
pub mod status;

pub use component::ComponentHealth;
pub use config::HealthCheckConfig;
pub use error::{HealthError, Result};
pub use manager::HealthCheckManager;
pub use report::{aggregate, read_report, write_report, HealthReport};
pub use status::{HealthCheckEvent, HealthCheckReply, HealthStatus};
