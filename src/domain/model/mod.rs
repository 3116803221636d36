// Domain models - Core types and data structures

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::filters::AudioFilter;

#[cfg(test)]
mod tests;

/// Time specification with precision - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "TimeValue", into = "f64")]
pub struct TimeSpec {
    pub seconds: f64,
}

/// Accepted spellings of a time value in job files
#[derive(Deserialize)]
#[serde(untagged)]
enum TimeValue {
    Seconds(f64),
    Text(String),
}

impl TryFrom<TimeValue> for TimeSpec {
    type Error = DomainError;

    fn try_from(value: TimeValue) -> Result<Self, Self::Error> {
        match value {
            TimeValue::Seconds(seconds) => Self::checked_seconds(seconds),
            TimeValue::Text(text) => Self::parse(&text),
        }
    }
}

impl From<TimeSpec> for f64 {
    fn from(time: TimeSpec) -> Self {
        time.seconds
    }
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Create a new TimeSpec from hours, minutes, seconds, milliseconds
    pub fn from_components(hours: u32, minutes: u32, seconds: u32, milliseconds: u32) -> Self {
        let total_seconds = hours as f64 * 3600.0
            + minutes as f64 * 60.0
            + seconds as f64
            + milliseconds as f64 / 1000.0;
        Self { seconds: total_seconds }
    }

    /// Convert to Duration, saturating values too large to represent
    pub fn to_duration(&self) -> Duration {
        self.try_to_duration().unwrap_or(Duration::MAX)
    }

    /// Convert to Duration, `None` when the value is not representable
    pub fn try_to_duration(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.seconds.max(0.0)).ok()
    }

    fn checked_seconds(seconds: f64) -> Result<Self, DomainError> {
        if !seconds.is_finite() {
            return Err(DomainError::BadArgs(format!("Time must be finite, got {}", seconds)));
        }
        if seconds < 0.0 {
            return Err(DomainError::BadArgs("Time cannot be negative".to_string()));
        }
        Ok(Self::from_seconds(seconds))
    }

    /// Convert from Duration
    pub fn from_duration(duration: Duration) -> Self {
        Self {
            seconds: duration.as_secs_f64(),
        }
    }

    /// Parse time string in various formats
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        // Try parsing as seconds (float)
        if let Ok(seconds) = trimmed.parse::<f64>() {
            return Self::checked_seconds(seconds);
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() == 2 {
            // MM:SS.ms format
            let minutes = parts[0]
                .parse::<u32>()
                .map_err(|_| DomainError::BadArgs("Invalid minutes format".to_string()))?;
            let seconds_part = parts[1]
                .parse::<f64>()
                .map_err(|_| DomainError::BadArgs("Invalid seconds format".to_string()))?;

            if !(0.0..60.0).contains(&seconds_part) {
                return Err(DomainError::BadArgs("Seconds must be less than 60".to_string()));
            }

            Ok(Self::from_seconds(minutes as f64 * 60.0 + seconds_part))
        } else if parts.len() == 3 {
            // HH:MM:SS.ms format
            let hours = parts[0]
                .parse::<u32>()
                .map_err(|_| DomainError::BadArgs("Invalid hours format".to_string()))?;
            let minutes = parts[1]
                .parse::<u32>()
                .map_err(|_| DomainError::BadArgs("Invalid minutes format".to_string()))?;
            let seconds_part = parts[2]
                .parse::<f64>()
                .map_err(|_| DomainError::BadArgs("Invalid seconds format".to_string()))?;

            if minutes >= 60 {
                return Err(DomainError::BadArgs("Minutes must be less than 60".to_string()));
            }
            if !(0.0..60.0).contains(&seconds_part) {
                return Err(DomainError::BadArgs("Seconds must be less than 60".to_string()));
            }

            Ok(Self::from_seconds(
                hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds_part,
            ))
        } else {
            Err(DomainError::BadArgs(
                "Invalid time format. Supported formats: seconds (e.g., 123.45), MM:SS.ms (e.g., 2:30.5), HH:MM:SS.ms (e.g., 1:02:30.5)".to_string()
            ))
        }
    }

    /// Format as HH:MM:SS.mmm, the form passed to the encoder's `-ss`/`-t`
    pub fn format_hms(&self) -> String {
        let total_millis = (self.seconds.max(0.0) * 1000.0).round() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let seconds = (total_millis % 60_000) / 1000;
        let milliseconds = total_millis % 1000;
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// Properties of the source file a clip is cut from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceMedia {
    pub path: PathBuf,
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
}

/// Output frame rate selection
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameRate {
    /// Keep the source frame rate
    #[default]
    Source,
    /// Convert to the given rate
    Target(f64),
}

/// Output resolution selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Keep the source dimensions
    #[default]
    Source,
    /// Scale to the given dimensions
    Target { width: u32, height: u32 },
}

/// Crop rectangle in output pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

/// Video bitrate target with optional VBV bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoBitrate {
    pub target_kbps: u32,
    #[serde(default)]
    pub min_offset_kbps: u32,
    #[serde(default)]
    pub max_offset_kbps: u32,
}

impl Default for VideoBitrate {
    fn default() -> Self {
        Self {
            target_kbps: 2000,
            min_offset_kbps: 0,
            max_offset_kbps: 0,
        }
    }
}

impl VideoBitrate {
    /// Lower bound, `None` when no min offset is configured
    pub fn min_rate_kbps(&self) -> Option<u32> {
        (self.min_offset_kbps > 0).then(|| self.target_kbps.saturating_sub(self.min_offset_kbps))
    }

    /// Upper bound, `None` when no max offset is configured
    pub fn max_rate_kbps(&self) -> Option<u32> {
        (self.max_offset_kbps > 0).then(|| self.target_kbps.saturating_add(self.max_offset_kbps))
    }
}

/// Output container and the stream kinds it can carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerFormat {
    /// Muxer name passed to `-f`
    pub name: String,
    pub extension: String,
    #[serde(default = "default_true")]
    pub supports_video: bool,
    #[serde(default = "default_true")]
    pub supports_audio: bool,
}

impl ContainerFormat {
    pub fn new(name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            supports_video: true,
            supports_audio: true,
        }
    }

    pub fn mp4() -> Self {
        Self::new("mp4", "mp4")
    }

    pub fn matroska() -> Self {
        Self::new("matroska", "mkv")
    }

    pub fn webm() -> Self {
        Self::new("webm", "webm")
    }

    /// Audio-only container
    pub fn mp3() -> Self {
        Self {
            supports_video: false,
            ..Self::new("mp3", "mp3")
        }
    }

    /// Video-only container
    pub fn gif() -> Self {
        Self {
            supports_audio: false,
            ..Self::new("gif", "gif")
        }
    }
}

/// Per-source-stream audio configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrackSetting {
    /// Absolute stream index in the source file
    pub stream_index: usize,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub filters: Vec<AudioFilter>,
    /// Mix this track with the other tracks flagged for merging
    #[serde(default)]
    pub merge: bool,
}

impl AudioTrackSetting {
    pub fn new(stream_index: usize) -> Self {
        Self {
            stream_index,
            enabled: true,
            filters: Vec::new(),
            merge: false,
        }
    }

    pub fn with_filter(mut self, filter: AudioFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn merged(mut self) -> Self {
        self.merge = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Filters that contribute to the graph, in chain order
    pub fn active_filters(&self) -> impl Iterator<Item = &AudioFilter> {
        self.filters.iter().filter(|filter| filter.is_enabled())
    }
}

/// Everything needed to encode one clip. Jobs hold an immutable snapshot of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSpec {
    #[serde(default)]
    pub name: String,
    /// Bound from the owning video when loaded from a job file
    #[serde(default)]
    pub source: SourceMedia,
    #[serde(default)]
    pub start: TimeSpec,
    pub duration: TimeSpec,
    #[serde(default)]
    pub frame_rate: FrameRate,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub crop: Option<CropRect>,
    #[serde(default)]
    pub video_codec: Option<String>,
    #[serde(default)]
    pub audio_codec: Option<String>,
    #[serde(default)]
    pub video_bitrate: VideoBitrate,
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate_kbps: u32,
    pub container: ContainerFormat,
    /// Appended to the encoder arguments verbatim
    #[serde(default)]
    pub extra_options: String,
    #[serde(default)]
    pub two_pass: bool,
    #[serde(default)]
    pub audio_tracks: Vec<AudioTrackSetting>,
    pub output: PathBuf,
    #[serde(default = "default_true")]
    pub overwrite: bool,
}

impl ClipSpec {
    /// Create a clip with source-preserving video settings and no audio tracks
    pub fn new(
        source: SourceMedia,
        start: TimeSpec,
        duration: TimeSpec,
        container: ContainerFormat,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: String::new(),
            source,
            start,
            duration,
            frame_rate: FrameRate::Source,
            resolution: Resolution::Source,
            crop: None,
            video_codec: None,
            audio_codec: None,
            video_bitrate: VideoBitrate::default(),
            audio_bitrate_kbps: default_audio_bitrate(),
            container,
            extra_options: String::new(),
            two_pass: false,
            audio_tracks: Vec::new(),
            output: output.into(),
            overwrite: true,
        }
    }

    /// Output frame dimensions after scaling, before cropping
    pub fn target_dimensions(&self) -> (u32, u32) {
        match self.resolution {
            Resolution::Source => (self.source.width, self.source.height),
            Resolution::Target { width, height } => (width, height),
        }
    }

    /// Whether the output will carry a video stream
    pub fn has_video_output(&self) -> bool {
        self.container.supports_video && self.video_codec.is_some()
    }

    /// Whether the output will carry audio
    pub fn has_audio_output(&self) -> bool {
        self.container.supports_audio
            && self.audio_codec.is_some()
            && self.enabled_tracks().next().is_some()
    }

    pub fn enabled_tracks(&self) -> impl Iterator<Item = &AudioTrackSetting> {
        self.audio_tracks.iter().filter(|track| track.enabled)
    }

    /// Name used in logs and job listings
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.output.display().to_string()
        } else {
            self.name.clone()
        }
    }
}

/// A source video together with the clips configured on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceVideo {
    pub name: String,
    #[serde(flatten)]
    pub media: SourceMedia,
    #[serde(default)]
    pub clips: Vec<ClipSpec>,
}

impl SourceVideo {
    /// Point every clip at this video's media
    pub fn bind_clips(&mut self) {
        for clip in &mut self.clips {
            clip.source = self.media.clone();
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_audio_bitrate() -> u32 {
    192
}
