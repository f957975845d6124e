//! Shared configuration for Warden.
//!
//! # Storage Structure
//!
//! All agent data is stored under `~/.warden/`:
//!
//! ```text
//! ~/.warden/
//! ├── config/       # User configuration (.env)
//! └── reports/      # Health reports
//! ```
//!
//! # Environment Variables
//!
//! - `WARDEN_STATE_DIR`: Override the base state directory
//! - `WARDEN_CONFIG_DIR`: Override the config directory
//! - `WARDEN_REPORT_DIR`: Override the report directory
//! - `WARDEN_LOG`: Log filter for binaries (`tracing_subscriber::EnvFilter` syntax)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "WARDEN_STATE_DIR";

/// Environment variable for custom config directory.
pub const CONFIG_DIR_ENV: &str = "WARDEN_CONFIG_DIR";

/// Environment variable for custom report directory.
pub const REPORT_DIR_ENV: &str = "WARDEN_REPORT_DIR";

/// Environment variable holding the log filter.
pub const LOG_FILTER_ENV: &str = "WARDEN_LOG";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".warden";

const CONFIG_SUBDIR: &str = "config";
const REPORTS_SUBDIR: &str = "reports";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get the Warden state directory.
///
/// The state directory is determined by:
/// 1. `WARDEN_STATE_DIR` environment variable if set
/// 2. `~/.warden` if home directory is available
/// 3. `.warden` in current directory as fallback
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_state_dir(dirs::home_dir().as_deref()))
        })
        .clone()
}

fn default_state_dir(home: Option<&Path>) -> PathBuf {
    home.map(|h| h.join(DEFAULT_STATE_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
}

fn dir_from_env(var: &str, subdir: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir().join(subdir))
}

/// Get the user config directory.
///
/// Defaults to `~/.warden/config/` or `WARDEN_CONFIG_DIR` env var.
pub fn config_dir() -> PathBuf {
    dir_from_env(CONFIG_DIR_ENV, CONFIG_SUBDIR)
}

/// Get the health report directory.
///
/// Defaults to `~/.warden/reports/` or `WARDEN_REPORT_DIR` env var.
pub fn reports_dir() -> PathBuf {
    dir_from_env(REPORT_DIR_ENV, REPORTS_SUBDIR)
}

/// Get the default health report file path.
pub fn health_report_file() -> PathBuf {
    reports_dir().join("health.json")
}

/// Get the .env file path.
pub fn env_file() -> PathBuf {
    config_dir().join(".env")
}

/// Ensure the state directory and all subdirectories exist.
///
/// # Errors
/// Returns an error if any directory cannot be created.
pub fn ensure_all_dirs() -> std::io::Result<()> {
    for dir in managed_dirs() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Directories Warden creates under its state directory. Logs go to stderr,
/// so there is no log directory.
fn managed_dirs() -> [PathBuf; 2] {
    [config_dir(), reports_dir()]
}
