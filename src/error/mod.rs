//! Error handling module for ClipEnc

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for ClipEnc operations
#[derive(Error, Debug)]
pub enum EncodeError {
    /// Programming or state error, e.g. building arguments without a bound clip
    #[error("Specification error: {0}")]
    Specification(String),

    /// Clip settings rejected by validation
    #[error("Invalid clip: {0}")]
    InvalidClip(#[from] DomainError),

    /// Encoder executable could not be started
    #[error("Failed to launch encoder {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// First pass finished without leaving its statistics file behind
    #[error("Pass log missing after first pass: {path}")]
    MissingPassLog { path: PathBuf },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Job file could not be read or parsed
    #[error("Failed to load job file {path}: {message}")]
    JobFile { path: String, message: String },

    /// Selection names a video or clip that does not exist, or is ambiguous
    #[error("Invalid selection: {0}")]
    Selection(String),

    /// Job id not present in the work list
    #[error("Unknown job: {0}")]
    UnknownJob(u64),

    /// Operation not allowed in the job's current state
    #[error("Job {id} is {state}, cannot {action}")]
    InvalidJobState {
        id: u64,
        state: String,
        action: &'static str,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ClipEnc operations
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;
