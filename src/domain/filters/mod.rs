//! Audio filters applied per source track
//!
//! Each variant carries its own parameters and renders a single filter-graph
//! fragment (`name=args`, without input/output labels).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Highest gain a volume filter accepts, in percent
pub const MAX_VOLUME_PERCENT: u32 = 1000;

/// A filter that can be chained on an audio track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioFilter {
    /// Channel remapping via `pan`
    Pan(PanFilter),
    /// Gain via `volume`
    Volume(VolumeFilter),
}

impl AudioFilter {
    /// Filter-graph fragment for this filter
    pub fn fragment(&self) -> String {
        match self {
            AudioFilter::Pan(pan) => pan.fragment(),
            AudioFilter::Volume(volume) => volume.fragment(),
        }
    }

    /// Human-readable name
    pub fn name(&self) -> String {
        match self {
            AudioFilter::Pan(pan) => match pan.preset {
                Some(preset) => format!("Pan ({})", preset),
                None => format!("Pan ({})", pan.layout),
            },
            AudioFilter::Volume(volume) => format!("Volume {}%", volume.percent()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            AudioFilter::Pan(pan) => pan.enabled,
            AudioFilter::Volume(volume) => volume.enabled,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            AudioFilter::Pan(pan) => pan.validate(),
            AudioFilter::Volume(volume) => volume.validate(),
        }
    }
}

impl fmt::Display for AudioFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Named channel mappings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanPreset {
    #[serde(rename = "mono")]
    Mono,
    #[serde(rename = "stereo-swap")]
    StereoSwap,
    #[serde(rename = "left-only")]
    LeftOnly,
    #[serde(rename = "right-only")]
    RightOnly,
    #[serde(rename = "downmix-5.1")]
    Downmix51,
}

impl PanPreset {
    /// Output layout and channel mapping for the preset
    pub fn mapping(&self) -> (&'static str, &'static str) {
        match self {
            PanPreset::Mono => ("mono", "c0=0.5*c0+0.5*c1"),
            PanPreset::StereoSwap => ("stereo", "c0=c1|c1=c0"),
            PanPreset::LeftOnly => ("stereo", "c0=c0|c1=c0"),
            PanPreset::RightOnly => ("stereo", "c0=c1|c1=c1"),
            PanPreset::Downmix51 => ("stereo", "FL=FL+0.707*FC+0.707*BL|FR=FR+0.707*FC+0.707*BR"),
        }
    }
}

impl fmt::Display for PanPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PanPreset::Mono => "mono",
            PanPreset::StereoSwap => "stereo-swap",
            PanPreset::LeftOnly => "left-only",
            PanPreset::RightOnly => "right-only",
            PanPreset::Downmix51 => "downmix-5.1",
        };
        f.write_str(name)
    }
}

/// Channel pan: `pan=<layout>|<channels>`. With a preset, an empty layout
/// or mapping falls back to the preset's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanFilter {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub layout: String,
    /// Channel mapping, e.g. `c0=c1|c1=c0`
    #[serde(default)]
    pub channels: String,
    #[serde(default)]
    pub preset: Option<PanPreset>,
}

impl PanFilter {
    pub fn new(layout: impl Into<String>, channels: impl Into<String>) -> Self {
        Self {
            enabled: true,
            layout: layout.into(),
            channels: channels.into(),
            preset: None,
        }
    }

    pub fn from_preset(preset: PanPreset) -> Self {
        let (layout, channels) = preset.mapping();
        Self {
            preset: Some(preset),
            ..Self::new(layout, channels)
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Effective layout and channel mapping
    pub fn mapping(&self) -> (&str, &str) {
        match self.preset {
            Some(preset) if self.layout.is_empty() || self.channels.is_empty() => preset.mapping(),
            _ => (&self.layout, &self.channels),
        }
    }

    pub fn fragment(&self) -> String {
        let (layout, channels) = self.mapping();
        format!("pan={}|{}", layout, channels)
    }

    fn validate(&self) -> Result<(), DomainError> {
        let (layout, channels) = self.mapping();
        if layout.trim().is_empty() || channels.trim().is_empty() {
            return Err(DomainError::InvalidFilter(
                "pan filter needs a layout and a channel mapping".to_string(),
            ));
        }
        Ok(())
    }
}

/// Gain: `volume=<factor>`, configured in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeFilter {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(rename = "percent", with = "percent_factor")]
    factor: f64,
}

impl VolumeFilter {
    pub fn from_percent(percent: u32) -> Self {
        Self {
            enabled: true,
            factor: percent as f64 / 100.0,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Gain factor, 1.00 = unchanged
    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn percent(&self) -> u32 {
        (self.factor * 100.0).round() as u32
    }

    pub fn fragment(&self) -> String {
        format!("volume={:.2}", self.factor)
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.percent() > MAX_VOLUME_PERCENT {
            return Err(DomainError::InvalidFilter(format!(
                "volume {}% exceeds {}%",
                self.percent(),
                MAX_VOLUME_PERCENT
            )));
        }
        Ok(())
    }
}

mod percent_factor {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(factor: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32((factor * 100.0).round() as u32)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let percent = u32::deserialize(deserializer)?;
        Ok(percent as f64 / 100.0)
    }
}

fn default_true() -> bool {
    true
}
