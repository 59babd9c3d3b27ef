use clap::Parser;
use colored::*;
use std::process;
use tracing_subscriber::EnvFilter;
use wayback::cli::formatter::colors_enabled;
use wayback::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // WAYBACK_LOG takes precedence, -v raises the default level
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let log_level = std::env::var("WAYBACK_LOG").unwrap_or_else(|_| default_level.to_string());

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    if !colors_enabled() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<wayback::WaybackError>() {
            Some(wayback::WaybackError::Config(_)) => 2,
            Some(wayback::WaybackError::Io(_)) => 3,
            Some(wayback::WaybackError::Parse(_)) | Some(wayback::WaybackError::Serialization(_)) => 4,
            Some(wayback::WaybackError::Reconstruction(_)) => 5,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Reconstruct(args) => wayback::cli::commands::reconstruct::run(args, cli.threads),
        Commands::Config(args) => wayback::cli::commands::config::run(args),
    }
}
