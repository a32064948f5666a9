//! edxgen CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Settings error
//! - 4: Template error

use std::process::ExitCode;

use clap::Parser;
use edxgen_config::ConfigError;
use edxgen_templates::TemplateError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const SETTINGS_ERROR: u8 = 3;
    pub const TEMPLATE_ERROR: u8 = 4;
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "edxgen=debug"
    } else if cli.quiet {
        "edxgen=error"
    } else {
        "edxgen=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{default_level},edxgen_config={lvl},edxgen_templates={lvl},warn",
            lvl = default_level.trim_start_matches("edxgen=")
        ))
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Config(command) => commands::config::execute(command, &cli.root),
        Commands::Render(args) => commands::render::execute(args, &cli.root),
        Commands::Patches(command) => commands::patches::execute(command, &cli.root),
        Commands::Walk(args) => commands::walk::execute(args, &cli.root),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

/// Map an error to its exit code by the first library error in its chain.
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<ConfigError>() {
            return match err {
                ConfigError::InvalidOverride(_) => ExitCodes::INVALID_ARGS,
                _ => ExitCodes::SETTINGS_ERROR,
            };
        }
        if let Some(err) = cause.downcast_ref::<TemplateError>() {
            return match err {
                TemplateError::Config(_) => ExitCodes::SETTINGS_ERROR,
                _ => ExitCodes::TEMPLATE_ERROR,
            };
        }
    }
    ExitCodes::GENERAL_ERROR
}
