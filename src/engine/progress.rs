//! Progress extraction from encoder diagnostic output
//!
//! The encoder reports statistics on its diagnostic stream as lines like
//! `frame=  120 fps= 30 q=28.0 size=  256kB time=00:00:04.00 bitrate= 512.3kbits/s`.
//! Each pattern is matched independently; only the frame count is required.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::model::TimeSpec;

static FRAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"frame=\s*(\d+)").expect("valid frame pattern"));
static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"time=\s*(\S+)").expect("valid time pattern"));
static BITRATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"bitrate=\s*([\d.]+)kbits/s").expect("valid bitrate pattern"));

/// One progress report from the encoder
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressSample {
    /// Frames written so far
    pub frame: u64,
    /// Position in the output timeline
    #[serde(with = "duration_secs")]
    pub time: Duration,
    /// Current bitrate in kbit/s
    pub bitrate_kbps: f64,
}

/// Stateless parser for encoder statistics lines
pub struct ProgressParser;

impl ProgressParser {
    /// Parse one diagnostic line. Returns `None` unless a frame count is present;
    /// time and bitrate fall back to zero when missing or malformed.
    pub fn parse(line: &str) -> Option<ProgressSample> {
        let frame = FRAME_PATTERN
            .captures(line)
            .and_then(|caps| caps[1].parse::<u64>().ok())?;

        let time = TIME_PATTERN
            .captures(line)
            .and_then(|caps| Self::parse_time(&caps[1]))
            .unwrap_or_default();

        let bitrate_kbps = BITRATE_PATTERN
            .captures(line)
            .and_then(|caps| caps[1].parse::<f64>().ok())
            .unwrap_or(0.0);

        Some(ProgressSample {
            frame,
            time,
            bitrate_kbps,
        })
    }

    fn parse_time(token: &str) -> Option<Duration> {
        TimeSpec::parse(token).ok()?.try_to_duration()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(seconds.max(0.0)).map_err(serde::de::Error::custom)
    }
}
