//! Logging configuration and subscriber setup

use tracing_subscriber::EnvFilter;

use crate::adapters::toml_config::{EngineSettings, LogFormat};
use crate::error::{EncodeError, EncodeResult};

/// Logging configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default filter directive, used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
    /// Include target module information
    pub target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            target: false,
        }
    }
}

impl LoggingConfig {
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            level: settings.log_level.clone(),
            format: settings.log_format,
            ..Default::default()
        }
    }

    /// `RUST_LOG` wins over the configured level
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Logging system manager
pub struct LoggingSystem {
    config: LoggingConfig,
}

impl LoggingSystem {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    /// Install the global subscriber. Logs go to stderr so stdout stays
    /// free for command output.
    pub fn initialize(&self) -> EncodeResult<()> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.config.env_filter())
            .with_target(self.config.target)
            .with_writer(std::io::stderr);

        let installed = match self.config.format {
            LogFormat::Pretty => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
        installed.map_err(|e| EncodeError::Config {
            message: format!("failed to initialise logging: {}", e),
        })?;

        tracing::debug!(
            "Logging initialised: level={} format={}",
            self.config.level,
            self.config.format
        );
        Ok(())
    }

    /// Log version information
    pub fn log_system_info(&self) {
        tracing::info!("clipenc {}", env!("CARGO_PKG_VERSION"));
    }
}
