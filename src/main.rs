//! ClipEnc CLI
//!
//! Encodes clips described in a job file through an external encoder process.
//!
//! # Features
//!
//! - Per-track audio filter chains with optional mixdown
//! - Single and two-pass encoding with automatic pass-log cleanup
//! - Several jobs in parallel with live progress and Ctrl-C cancellation
//!
//! # Usage
//!
//! ```bash
//! clipenc encode --jobs clips.toml
//! clipenc encode --jobs clips.toml --video lecture --clip intro
//! clipenc args --jobs clips.yaml --json
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use clipenc_cli::cli::{commands, Cli, Commands};
use clipenc_cli::config_initialization::initialize_configuration_hierarchy;
use clipenc_cli::utils::logging::{LoggingConfig, LoggingSystem};

/// Main entry point for the ClipEnc CLI application
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    let settings = initialize_configuration_hierarchy(&cli)?;

    // Initialize logging
    let logging = LoggingSystem::new(LoggingConfig::from_settings(&settings));
    logging.initialize()?;
    logging.log_system_info();

    // Execute the requested command
    match cli.command {
        Commands::Encode(args) => {
            info!("Executing encode command");
            commands::encode(args, &settings, cli.json).await?;
        }
        Commands::Args(args) => {
            info!("Executing args command");
            commands::args(args, &settings, cli.json)?;
        }
    }

    info!("ClipEnc completed successfully");
    Ok(())
}
