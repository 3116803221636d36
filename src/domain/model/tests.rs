// Unit tests for domain models

use super::*;
use crate::domain::filters::{AudioFilter, VolumeFilter};

fn source_1080p() -> SourceMedia {
    SourceMedia {
        path: PathBuf::from("talk.mp4"),
        frame_rate: 30.0,
        width: 1920,
        height: 1080,
    }
}

#[test]
fn test_time_spec_from_components() {
    let time = TimeSpec::from_components(1, 2, 3, 500);
    assert_eq!(time.seconds, 3723.5);
}

#[test]
fn test_time_spec_parse_formats() {
    assert_eq!(TimeSpec::parse("123.456").unwrap().seconds, 123.456);
    assert_eq!(TimeSpec::parse("01:30.5").unwrap().seconds, 90.5);
    assert_eq!(TimeSpec::parse("01:02:03.5").unwrap().seconds, 3723.5);
}

#[test]
fn test_time_spec_parse_invalid() {
    assert!(TimeSpec::parse("invalid").is_err());
    assert!(TimeSpec::parse("00:60").is_err());
    assert!(TimeSpec::parse("01:60:00").is_err());
    assert!(TimeSpec::parse("-10").is_err());
    assert!(TimeSpec::parse("inf").is_err());
    assert!(TimeSpec::parse("NaN").is_err());
}

#[test]
fn test_time_spec_duration_conversion_never_panics() {
    assert_eq!(TimeSpec::from_seconds(1.5).to_duration(), Duration::from_millis(1500));
    assert_eq!(TimeSpec::from_seconds(1e20).try_to_duration(), None);
    assert_eq!(TimeSpec::from_seconds(1e20).to_duration(), Duration::MAX);
    assert_eq!(TimeSpec::from_seconds(f64::INFINITY).to_duration(), Duration::MAX);
    assert_eq!(TimeSpec::from_seconds(f64::NAN).to_duration(), Duration::ZERO);
}

#[test]
fn test_time_spec_format_hms() {
    assert_eq!(TimeSpec::from_components(1, 2, 3, 456).format_hms(), "01:02:03.456");
    assert_eq!(TimeSpec::from_seconds(4.0).to_string(), "00:00:04.000");
    assert_eq!(TimeSpec::from_seconds(59.9996).format_hms(), "00:01:00.000");
}

#[test]
fn test_time_spec_deserializes_from_number_or_text() {
    #[derive(Deserialize)]
    struct Holder {
        a: TimeSpec,
        b: TimeSpec,
    }

    let holder: Holder = serde_json::from_str(r#"{"a": 12.5, "b": "00:01:02.5"}"#).unwrap();
    assert_eq!(holder.a.seconds, 12.5);
    assert_eq!(holder.b.seconds, 62.5);

    let negative: Result<Holder, _> = serde_json::from_str(r#"{"a": -1, "b": 0}"#);
    assert!(negative.is_err());

    let infinite: Result<Holder, _> = toml::from_str("a = inf\nb = 0.0");
    assert!(infinite.is_err());
    let not_a_number: Result<Holder, _> = toml::from_str("a = 1.0\nb = nan");
    assert!(not_a_number.is_err());
}

#[test]
fn test_video_bitrate_bounds() {
    let bitrate = VideoBitrate {
        target_kbps: 2000,
        min_offset_kbps: 200,
        max_offset_kbps: 0,
    };
    assert_eq!(bitrate.min_rate_kbps(), Some(1800));
    assert_eq!(bitrate.max_rate_kbps(), None);

    let clamped = VideoBitrate {
        target_kbps: 100,
        min_offset_kbps: 500,
        max_offset_kbps: 50,
    };
    assert_eq!(clamped.min_rate_kbps(), Some(0));
    assert_eq!(clamped.max_rate_kbps(), Some(150));
}

#[test]
fn test_clip_target_dimensions() {
    let mut clip = ClipSpec::new(
        source_1080p(),
        TimeSpec::from_seconds(0.0),
        TimeSpec::from_seconds(5.0),
        ContainerFormat::mp4(),
        "out.mp4",
    );
    assert_eq!(clip.target_dimensions(), (1920, 1080));

    clip.resolution = Resolution::Target {
        width: 1280,
        height: 720,
    };
    assert_eq!(clip.target_dimensions(), (1280, 720));
}

#[test]
fn test_clip_output_capabilities_follow_container() {
    let mut clip = ClipSpec::new(
        source_1080p(),
        TimeSpec::from_seconds(0.0),
        TimeSpec::from_seconds(5.0),
        ContainerFormat::mp3(),
        "out.mp3",
    );
    clip.video_codec = Some("libx264".to_string());
    clip.audio_codec = Some("libmp3lame".to_string());
    clip.audio_tracks.push(AudioTrackSetting::new(1));

    assert!(!clip.has_video_output());
    assert!(clip.has_audio_output());

    clip.audio_tracks[0].enabled = false;
    assert!(!clip.has_audio_output());
}

#[test]
fn test_active_filters_skip_disabled() {
    let track = AudioTrackSetting::new(1)
        .with_filter(AudioFilter::Volume(VolumeFilter::from_percent(150)))
        .with_filter(AudioFilter::Volume(VolumeFilter::from_percent(80).disabled()));
    assert_eq!(track.active_filters().count(), 1);
}

#[test]
fn test_source_video_binds_clips() {
    let mut video = SourceVideo {
        name: "talk".to_string(),
        media: source_1080p(),
        clips: vec![ClipSpec::new(
            SourceMedia::default(),
            TimeSpec::from_seconds(1.0),
            TimeSpec::from_seconds(2.0),
            ContainerFormat::mp4(),
            "a.mp4",
        )],
    };
    video.bind_clips();
    assert_eq!(video.clips[0].source, source_1080p());
}
