// Job file adapter - Source videos and their clips from TOML, YAML or JSON

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::model::SourceVideo;
use crate::error::{EncodeError, EncodeResult};

/// Serialization format of a job file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFileFormat {
    Toml,
    Yaml,
    Json,
}

impl JobFileFormat {
    /// Pick the format from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_lowercase();
        match extension.as_str() {
            "toml" => Some(JobFileFormat::Toml),
            "yaml" | "yml" => Some(JobFileFormat::Yaml),
            "json" => Some(JobFileFormat::Json),
            _ => None,
        }
    }
}

/// Contents of a job file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobFile {
    #[serde(default)]
    pub videos: Vec<SourceVideo>,
}

impl JobFile {
    pub fn load(path: &Path) -> EncodeResult<Self> {
        let format = JobFileFormat::from_path(path).ok_or_else(|| EncodeError::JobFile {
            path: path.display().to_string(),
            message: "unsupported extension, expected .toml, .yaml, .yml or .json".to_string(),
        })?;
        let content = std::fs::read_to_string(path).map_err(|e| EncodeError::JobFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let file = Self::parse(&content, format).map_err(|message| EncodeError::JobFile {
            path: path.display().to_string(),
            message,
        })?;
        info!(
            "Loaded {} video(s) with {} clip(s) from {}",
            file.videos.len(),
            file.clip_count(),
            path.display()
        );
        Ok(file)
    }

    /// Parse job file text and bind every clip to its video
    pub fn parse(content: &str, format: JobFileFormat) -> Result<Self, String> {
        let mut file: JobFile = match format {
            JobFileFormat::Toml => toml::from_str(content).map_err(|e| e.to_string())?,
            JobFileFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string())?,
            JobFileFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string())?,
        };
        for video in &mut file.videos {
            video.bind_clips();
        }
        Ok(file)
    }

    pub fn clip_count(&self) -> usize {
        self.videos.iter().map(|video| video.clips.len()).sum()
    }
}
