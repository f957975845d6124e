//! Warden CLI entry point.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use warden_cli::cli::Cli;
use warden_cli::commands;
use warden_core::config;

fn main() {
    // Missing .env is fine; settings may come from the environment.
    let _ = dotenvy::from_path(config::env_file());

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env(config::LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = commands::execute(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
