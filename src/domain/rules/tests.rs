// Unit tests for business rules

use std::path::PathBuf;

use super::*;
use crate::domain::filters::{AudioFilter, VolumeFilter};

fn create_test_clip() -> ClipSpec {
    let source = SourceMedia {
        path: PathBuf::from("input.mp4"),
        frame_rate: 29.97,
        width: 1920,
        height: 1080,
    };
    ClipSpec::new(
        source,
        TimeSpec::from_seconds(10.0),
        TimeSpec::from_seconds(20.0),
        ContainerFormat::mp4(),
        "clip.mp4",
    )
}

#[test]
fn test_valid_clip_passes() {
    let mut clip = create_test_clip();
    clip.crop = Some(CropRect {
        width: 1280,
        height: 720,
        x: 640,
        y: 360,
    });
    clip.audio_tracks = vec![AudioTrackSetting::new(1), AudioTrackSetting::new(2)];
    assert!(ClipValidator::validate(&clip).is_ok());
}

#[test]
fn test_zero_duration_rejected() {
    let mut clip = create_test_clip();
    clip.duration = TimeSpec::from_seconds(0.0);
    assert!(matches!(
        ClipValidator::validate(&clip),
        Err(DomainError::InvalidTimeRange(_))
    ));
}

#[test]
fn test_non_finite_times_rejected() {
    for (start, duration) in [
        (0.0, f64::INFINITY),
        (0.0, f64::NAN),
        (f64::NAN, 5.0),
        (f64::INFINITY, 5.0),
    ] {
        let mut clip = create_test_clip();
        clip.start = TimeSpec::from_seconds(start);
        clip.duration = TimeSpec::from_seconds(duration);
        assert!(matches!(
            ClipValidator::validate(&clip),
            Err(DomainError::InvalidTimeRange(_))
        ));
    }
}

#[test]
fn test_crop_must_fit_scaled_frame() {
    let mut clip = create_test_clip();
    clip.resolution = Resolution::Target {
        width: 1280,
        height: 720,
    };
    clip.crop = Some(CropRect {
        width: 1280,
        height: 720,
        x: 10,
        y: 0,
    });
    assert!(matches!(
        ClipValidator::validate(&clip),
        Err(DomainError::InvalidCrop(_))
    ));
}

#[test]
fn test_duplicate_stream_index_rejected() {
    let mut clip = create_test_clip();
    clip.audio_tracks = vec![AudioTrackSetting::new(1), AudioTrackSetting::new(1).disabled()];
    assert_eq!(
        ClipValidator::validate(&clip),
        Err(DomainError::DuplicateStream(1))
    );
}

#[test]
fn test_min_offset_above_target_rejected() {
    let mut clip = create_test_clip();
    clip.video_bitrate = VideoBitrate {
        target_kbps: 500,
        min_offset_kbps: 600,
        max_offset_kbps: 0,
    };
    assert!(matches!(
        ClipValidator::validate(&clip),
        Err(DomainError::InvalidBitrate(_))
    ));
}

#[test]
fn test_filter_rules_apply_to_disabled_tracks_too() {
    let mut clip = create_test_clip();
    clip.audio_tracks = vec![AudioTrackSetting::new(1)
        .disabled()
        .with_filter(AudioFilter::Volume(VolumeFilter::from_percent(5000)))];
    assert!(matches!(
        ClipValidator::validate(&clip),
        Err(DomainError::InvalidFilter(_))
    ));
}
