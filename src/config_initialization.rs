//! Configuration initialization and hierarchy management

use anyhow::{Context, Result};
use tracing::debug;

use crate::adapters::{EngineSettings, TomlConfigAdapter};
use crate::cli::Cli;

/// Resolve engine settings with precedence CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<EngineSettings> {
    // Steps 1 and 2: defaults, overlaid by the first config file found
    let mut settings = match TomlConfigAdapter::locate(cli.config.as_deref())? {
        Some(path) => TomlConfigAdapter::load_file(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => EngineSettings::default(),
    };

    // Step 3: environment variables
    TomlConfigAdapter::apply_env(&mut settings, |key| std::env::var(key).ok())
        .context("Invalid environment override")?;

    // Step 4: command-line flags
    apply_cli_configuration_overrides(&mut settings, cli);

    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// Apply CLI argument overrides to configuration
fn apply_cli_configuration_overrides(settings: &mut EngineSettings, cli: &Cli) {
    let mut cli_overrides = 0;

    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
        cli_overrides += 1;
    }
    if let Some(encoder) = &cli.encoder {
        settings.encoder_path = encoder.clone();
        cli_overrides += 1;
    }
    if let Some(max_parallel) = cli.max_parallel {
        settings.max_parallel_jobs = max_parallel;
        cli_overrides += 1;
    }

    if cli_overrides > 0 {
        debug!("Applied {} CLI configuration overrides", cli_overrides);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_cli_overrides_win() {
        let cli = Cli::parse_from([
            "clipenc",
            "--encoder",
            "/opt/ffmpeg",
            "--max-parallel",
            "2",
            "--log-level",
            "debug",
            "args",
            "--jobs",
            "jobs.toml",
        ]);
        let mut settings = EngineSettings::default();
        apply_cli_configuration_overrides(&mut settings, &cli);

        assert_eq!(settings.encoder_path, PathBuf::from("/opt/ffmpeg"));
        assert_eq!(settings.max_parallel_jobs, 2);
        assert_eq!(settings.log_level, "debug");
    }
}
