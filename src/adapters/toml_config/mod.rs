// TOML config adapter - Engine settings from defaults, file and environment

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EncodeError, EncodeResult};

/// Files probed, in order, when no config path is given
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["clipenc.toml", "config/clipenc.toml"];

/// Environment variables and the setting each one overrides
pub const ENV_ENCODER: &str = "CLIPENC_ENCODER";
pub const ENV_MAX_PARALLEL: &str = "CLIPENC_MAX_PARALLEL";
pub const ENV_LOG_LEVEL: &str = "CLIPENC_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "CLIPENC_LOG_FORMAT";

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(EncodeError::Config {
                message: format!("unknown log format '{}'", other),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Encoder executable, resolved through PATH when not absolute
    pub encoder_path: PathBuf,
    /// Maximum number of encoder processes running at once
    pub max_parallel_jobs: usize,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Capacity of each job's event channel
    pub event_capacity: usize,
    /// Diagnostic lines kept per pass for failure reports
    pub diagnostic_tail_lines: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            encoder_path: PathBuf::from("ffmpeg"),
            max_parallel_jobs: num_cpus::get().max(1),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            event_capacity: 1024,
            diagnostic_tail_lines: 20,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> EncodeResult<()> {
        if self.encoder_path.as_os_str().is_empty() {
            return Err(config_error("encoder_path cannot be empty"));
        }
        if self.max_parallel_jobs == 0 {
            return Err(config_error("max_parallel_jobs must be at least 1"));
        }
        if self.event_capacity == 0 {
            return Err(config_error("event_capacity must be at least 1"));
        }
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(config_error(format!(
                "unknown log level '{}', expected one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

/// On-disk layout: settings live under a `[clipenc]` table
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    clipenc: EngineSettings,
}

/// Loads [`EngineSettings`] from TOML files and environment variables
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse settings from TOML text; missing keys keep their defaults
    pub fn parse(content: &str) -> EncodeResult<EngineSettings> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| config_error(format!("failed to parse TOML config: {}", e)))?;
        Ok(file.clipenc)
    }

    pub fn load_file(path: &Path) -> EncodeResult<EngineSettings> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            config_error(format!("failed to read {}: {}", path.display(), e))
        })?;
        info!("Loading configuration from: {}", path.display());
        Self::parse(&content)
    }

    /// First config file that exists: the explicit path, then the defaults.
    /// An explicit path that does not exist is an error.
    pub fn locate(explicit: Option<&Path>) -> EncodeResult<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(config_error(format!(
                    "config file does not exist: {}",
                    path.display()
                )));
            }
            return Ok(Some(path.to_path_buf()));
        }
        Ok(DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists()))
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env<F>(settings: &mut EngineSettings, lookup: F) -> EncodeResult<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;

        if let Some(encoder) = lookup(ENV_ENCODER) {
            settings.encoder_path = PathBuf::from(encoder);
            applied += 1;
        }
        if let Some(value) = lookup(ENV_MAX_PARALLEL) {
            settings.max_parallel_jobs = value.trim().parse().map_err(|e| {
                config_error(format!("invalid {} '{}': {}", ENV_MAX_PARALLEL, value, e))
            })?;
            applied += 1;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            settings.log_level = level;
            applied += 1;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            settings.log_format = format.parse()?;
            applied += 1;
        }

        if applied > 0 {
            debug!("Applied {} environment variable overrides", applied);
        }
        Ok(applied)
    }
}

fn config_error(message: impl Into<String>) -> EncodeError {
    EncodeError::Config {
        message: message.into(),
    }
}
