// Domain rules - Business logic and policies

use std::collections::HashSet;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Business rules a clip must satisfy before it can be queued
pub struct ClipValidator;

impl ClipValidator {
    /// Validate every rule, returning the first violation
    pub fn validate(clip: &ClipSpec) -> Result<(), DomainError> {
        Self::validate_time_range(clip)?;
        Self::validate_output(clip)?;
        Self::validate_video(clip)?;
        Self::validate_audio_tracks(clip)?;
        Ok(())
    }

    fn validate_time_range(clip: &ClipSpec) -> Result<(), DomainError> {
        if !clip.start.seconds.is_finite() || !clip.duration.seconds.is_finite() {
            return Err(DomainError::InvalidTimeRange(format!(
                "start and duration must be finite, got {} and {}",
                clip.start.seconds, clip.duration.seconds
            )));
        }
        if clip.start.seconds < 0.0 {
            return Err(DomainError::InvalidTimeRange(
                "start time cannot be negative".to_string(),
            ));
        }
        if clip.duration.seconds <= 0.0 {
            return Err(DomainError::InvalidTimeRange(format!(
                "duration must be positive, got {}",
                clip.duration
            )));
        }
        Ok(())
    }

    fn validate_output(clip: &ClipSpec) -> Result<(), DomainError> {
        if clip.output.as_os_str().is_empty() {
            return Err(DomainError::BadArgs("output path is empty".to_string()));
        }
        if clip.container.name.trim().is_empty() {
            return Err(DomainError::BadArgs("container format has no name".to_string()));
        }
        Ok(())
    }

    fn validate_video(clip: &ClipSpec) -> Result<(), DomainError> {
        if let FrameRate::Target(fps) = clip.frame_rate {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(DomainError::BadArgs(format!("frame rate {} is not positive", fps)));
            }
        }

        if let Resolution::Target { width, height } = clip.resolution {
            if width == 0 || height == 0 {
                return Err(DomainError::BadArgs(
                    "target dimensions cannot be zero".to_string(),
                ));
            }
        }

        if let Some(crop) = clip.crop {
            let (width, height) = clip.target_dimensions();
            if crop.width == 0 || crop.height == 0 {
                return Err(DomainError::InvalidCrop("crop size cannot be zero".to_string()));
            }
            if crop.x as u64 + crop.width as u64 > width as u64
                || crop.y as u64 + crop.height as u64 > height as u64
            {
                return Err(DomainError::InvalidCrop(format!(
                    "{}x{}+{}+{} exceeds {}x{}",
                    crop.width, crop.height, crop.x, crop.y, width, height
                )));
            }
        }

        let bitrate = clip.video_bitrate;
        if bitrate.min_offset_kbps > bitrate.target_kbps {
            return Err(DomainError::InvalidBitrate(format!(
                "min offset {}K is larger than target {}K",
                bitrate.min_offset_kbps, bitrate.target_kbps
            )));
        }
        Ok(())
    }

    fn validate_audio_tracks(clip: &ClipSpec) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        for track in &clip.audio_tracks {
            if !seen.insert(track.stream_index) {
                return Err(DomainError::DuplicateStream(track.stream_index));
            }
            for filter in &track.filters {
                filter.validate()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
