//! Command-line interface definition using clap.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};
use warden_health::HealthStatus;

/// Warden - in-process event bus and health checks for the enforcement agent
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register components on a bus and run one health check
    Health {
        /// Component to register, as `name` or `name=status`
        #[arg(short, long = "component")]
        components: Vec<ComponentSpec>,

        /// Write the report to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the report to the default report file
        #[arg(long, conflicts_with = "output")]
        save: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show a previously written health report
    Report {
        /// Report path (default: the default report file)
        path: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List the event kinds wired by the agent and their listener counts
    Kinds {
        /// Component to register, as `name` or `name=status`
        #[arg(short, long = "component")]
        components: Vec<ComponentSpec>,
    },

    /// Show storage paths
    Paths,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// A component given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSpec {
    /// Component name.
    pub name: String,
    /// Status it reports.
    pub status: HealthStatus,
}

impl FromStr for ComponentSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, status) = match s.split_once('=') {
            Some((name, status)) => {
                let status = HealthStatus::parse(status.trim())
                    .ok_or_else(|| format!("unknown health status '{}'", status.trim()))?;
                (name.trim(), status)
            }
            None => (s.trim(), HealthStatus::Healthy),
        };

        if name.is_empty() {
            return Err("component name must not be empty".to_string());
        }

        Ok(Self {
            name: name.to_string(),
            status,
        })
    }
}

impl Cli {
    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
