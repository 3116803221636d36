// Domain errors - Error types for the domain layer

use std::fmt;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// Invalid time range
    InvalidTimeRange(String),
    /// Crop rectangle does not fit the output frame
    InvalidCrop(String),
    /// Audio stream referenced more than once
    DuplicateStream(usize),
    /// Bitrate settings are inconsistent
    InvalidBitrate(String),
    /// Filter parameters out of range
    InvalidFilter(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::InvalidTimeRange(msg) => write!(f, "Invalid time range: {}", msg),
            DomainError::InvalidCrop(msg) => write!(f, "Invalid crop: {}", msg),
            DomainError::DuplicateStream(index) => {
                write!(f, "Audio stream {} is configured more than once", index)
            }
            DomainError::InvalidBitrate(msg) => write!(f, "Invalid bitrate: {}", msg),
            DomainError::InvalidFilter(msg) => write!(f, "Invalid filter: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
