//! CLI command handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use warden_core::config;
use warden_health::{read_report, HealthCheckConfig, HealthCheckManager, HealthError, HealthReport};

use crate::agent::Agent;
use crate::cli::{Commands, ComponentSpec, OutputFormat};

/// Errors returned by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("health check failed: {0}")]
    Health(#[from] HealthError),

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to create directories: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;

/// Execute a CLI command.
pub fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Health {
            components,
            output,
            save,
            format,
        } => {
            let target = match (output, save) {
                (Some(path), _) => Some(path),
                (None, true) => {
                    config::ensure_all_dirs()?;
                    Some(config::health_report_file())
                }
                (None, false) => None,
            };
            handle_health(&components, target, format)
        }
        Commands::Report { path, format } => {
            let path = path.unwrap_or_else(config::health_report_file);
            handle_report(&path, format)
        }
        Commands::Kinds { components } => handle_kinds(&components),
        Commands::Paths => handle_paths(),
    }
}

fn handle_health(
    components: &[ComponentSpec],
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let agent = Agent::start(components);
    agent.reload_config(&config::env_file().display().to_string());

    let mut health_config = HealthCheckConfig::new();
    if let Some(path) = output {
        health_config = health_config.with_report_path(path);
    }
    let manager = HealthCheckManager::with_config(Arc::clone(agent.bus()), health_config);

    let report = match manager.config().report_path {
        Some(_) => manager.persist_report()?,
        None => manager.run_check(),
    };
    print_report(&report, format)?;

    if let Some(path) = &manager.config().report_path {
        println!("\nReport written to {}", path.display());
    }
    Ok(())
}

fn handle_report(path: &Path, format: OutputFormat) -> Result<()> {
    let report = read_report(path)?;
    print_report(&report, format)
}

fn handle_kinds(components: &[ComponentSpec]) -> Result<()> {
    let agent = Agent::start(components);
    let kinds = agent.bus().kinds();

    if kinds.is_empty() {
        println!("No event kinds registered.");
        return Ok(());
    }

    println!("{:<60} LISTENERS", "KIND");
    for (kind, listeners) in kinds {
        println!("{:<60} {}", kind, listeners);
    }
    Ok(())
}

fn handle_paths() -> Result<()> {
    println!("Warden Storage Paths");
    println!("====================\n");

    println!("  State:   {}", config::state_dir().display());
    println!("  Config:  {}", config::config_dir().display());
    println!("  Reports: {}", config::reports_dir().display());
    println!("  Report:  {}", config::health_report_file().display());

    println!("\nEnvironment Variables:");
    for var in [
        config::STATE_DIR_ENV,
        config::CONFIG_DIR_ENV,
        config::REPORT_DIR_ENV,
        config::LOG_FILTER_ENV,
    ] {
        let value = std::env::var(var).unwrap_or_else(|_| "(not set)".to_string());
        println!("  {:<18} {}", format!("{}:", var), value);
    }
    Ok(())
}

fn print_report(report: &HealthReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => print!("{}", render_table(report)),
    }
    Ok(())
}

fn render_table(report: &HealthReport) -> String {
    let mut out = format!(
        "Overall: {} (checked {})\n",
        report.status,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if report.replies.is_empty() {
        out.push_str("No components reported.\n");
        return out;
    }

    out.push_str(&format!("\n{:<24} {:<10} DETAILS\n", "COMPONENT", "STATUS"));
    for (component, reply) in &report.replies {
        let details = reply
            .extended_status
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("{:<24} {:<10} {}\n", component, reply.status, details));
    }
    out
}
