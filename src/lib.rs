//! ClipEnc clip encoding library
//!
//! Translates clip specifications into encoder command lines, supervises the
//! encoder processes that run them and orchestrates many clip jobs at once.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod streams;
pub mod utils;

// Re-export commonly used types
pub use app::{Job, JobId, JobOrchestrator, JobSelection, JobSnapshot};
pub use domain::errors::DomainError;
pub use domain::model::{ClipSpec, SourceVideo};
pub use engine::{
    ArgumentBuilder, CancelHandle, EncoderEvent, JobState, PassExit, PassKind, PassResult,
    PassSequencer, ProcessSupervisor, ProgressParser, ProgressSample,
};
pub use error::{EncodeError, EncodeResult};
pub use ports::PassRunner;
pub use streams::FilterChainBuilder;
