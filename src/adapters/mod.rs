// Adapters - External system implementations

pub mod job_file;
pub mod toml_config;

// Re-export adapters
pub use job_file::{JobFile, JobFileFormat};
pub use toml_config::{EngineSettings, LogFormat, TomlConfigAdapter};
