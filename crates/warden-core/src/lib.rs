//! Warden Core - configuration shared by the agent's binaries.
//!
//! - **config**: state directory layout and environment overrides

pub mod config;

pub use config::{
    config_dir, ensure_all_dirs, env_file, health_report_file, reports_dir, state_dir,
};
