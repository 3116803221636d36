//! CLI module for ClipEnc
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// ClipEnc clip encoder
///
/// Encodes clips described in a job file through an external encoder,
/// running several jobs at once with progress reporting.
#[derive(Parser, Debug)]
#[command(name = "clipenc")]
#[command(about = "ClipEnc - Encode video clips through an external encoder")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Configuration file
    #[arg(long, global = true, env = "CLIPENC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Encoder executable
    #[arg(long, global = true)]
    pub encoder: Option<PathBuf>,

    /// Maximum number of encoders running at once
    #[arg(long, global = true)]
    pub max_parallel: Option<usize>,

    /// Emit JSON lines instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encode the selected clips
    Encode(args::EncodeArgs),
    /// Print the encoder command lines without running anything
    Args(args::ArgsArgs),
}
