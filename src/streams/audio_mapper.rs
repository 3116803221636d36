//! Audio stream mapping and per-track filter chains

use tracing::debug;

use crate::domain::model::{AudioTrackSetting, ClipSpec};
use crate::streams::{AudioPlan, StreamRef, AUDIO_MIX_LABEL};

/// Result of folding one track's filters
#[derive(Debug, Clone, PartialEq, Eq)]
struct TrackChain {
    segments: Vec<String>,
    output: StreamRef,
}

/// Builds the audio filter graph and output mapping for a clip
pub struct AudioMapper;

impl AudioMapper {
    pub fn plan(clip: &ClipSpec) -> AudioPlan {
        let enabled: Vec<&AudioTrackSetting> = clip.enabled_tracks().collect();
        if enabled.is_empty() {
            return AudioPlan::Disabled;
        }

        let chains: Vec<(bool, TrackChain)> = enabled
            .iter()
            .map(|track| (track.merge, Self::track_chain(track)))
            .collect();

        let merge_count = chains.iter().filter(|(merge, _)| *merge).count();
        let mix = merge_count >= 2;

        let mut segments = Vec::new();
        let mut outputs = Vec::new();
        let mut mix_inputs = Vec::new();

        for (merge, chain) in chains {
            segments.extend(chain.segments);
            if mix && merge {
                // The mix takes the slot of the first merged track
                if mix_inputs.is_empty() {
                    outputs.push(StreamRef::Label(AUDIO_MIX_LABEL.to_string()));
                }
                mix_inputs.push(chain.output.as_pad());
            } else {
                outputs.push(chain.output);
            }
        }

        if mix {
            debug!("Mixing {} audio tracks into one stream", mix_inputs.len());
            segments.push(format!(
                "{}amix=inputs={}[{}]",
                mix_inputs.concat(),
                mix_inputs.len(),
                AUDIO_MIX_LABEL
            ));
        }

        AudioPlan::Streams { segments, outputs }
    }

    /// Pad label for the filter at `position` in the chain of `stream_index`
    pub fn chain_label(stream_index: usize, position: usize) -> String {
        format!("a{}_{}", stream_index, position)
    }

    fn track_chain(track: &AudioTrackSetting) -> TrackChain {
        let (segments, output) = track.active_filters().enumerate().fold(
            (Vec::new(), StreamRef::input_stream(track.stream_index)),
            |(mut segments, input), (position, filter)| {
                let label = Self::chain_label(track.stream_index, position);
                segments.push(format!("{}{}[{}]", input.as_pad(), filter.fragment(), label));
                (segments, StreamRef::Label(label))
            },
        );
        TrackChain { segments, output }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filters::*;
    use crate::domain::model::*;

    fn clip_with(tracks: Vec<AudioTrackSetting>) -> ClipSpec {
        let mut clip = ClipSpec::new(
            SourceMedia::default(),
            TimeSpec::from_seconds(0.0),
            TimeSpec::from_seconds(1.0),
            ContainerFormat::mp4(),
            "out.mp4",
        );
        clip.audio_tracks = tracks;
        clip
    }

    fn volume(percent: u32) -> AudioFilter {
        AudioFilter::Volume(VolumeFilter::from_percent(percent))
    }

    #[test]
    fn test_no_enabled_tracks_disables_audio() {
        assert_eq!(AudioMapper::plan(&clip_with(vec![])), AudioPlan::Disabled);
        let only_disabled = clip_with(vec![
            AudioTrackSetting::new(1).disabled(),
            AudioTrackSetting::new(2).disabled().merged(),
        ]);
        assert_eq!(AudioMapper::plan(&only_disabled), AudioPlan::Disabled);
    }

    #[test]
    fn test_unfiltered_tracks_map_raw_streams() {
        let plan = AudioMapper::plan(&clip_with(vec![
            AudioTrackSetting::new(1),
            AudioTrackSetting::new(3),
        ]));
        assert_eq!(plan.graph(), None);
        let maps: Vec<String> = plan.outputs().iter().map(StreamRef::as_map).collect();
        assert_eq!(maps, vec!["0:1", "0:3"]);
    }

    #[test]
    fn test_chain_folds_filters_in_order() {
        let track = AudioTrackSetting::new(2)
            .with_filter(AudioFilter::Pan(PanFilter::from_preset(PanPreset::LeftOnly)))
            .with_filter(AudioFilter::Volume(VolumeFilter::from_percent(50).disabled()))
            .with_filter(volume(200));
        let plan = AudioMapper::plan(&clip_with(vec![track]));

        assert_eq!(
            plan.graph().unwrap(),
            "[0:2]pan=stereo|c0=c0|c1=c0[a2_0];[a2_0]volume=2.00[a2_1]"
        );
        assert_eq!(plan.outputs(), &[StreamRef::Label("a2_1".to_string())]);
    }

    #[test]
    fn test_labels_never_collide_across_tracks() {
        let plan = AudioMapper::plan(&clip_with(vec![
            AudioTrackSetting::new(1).with_filter(volume(120)),
            AudioTrackSetting::new(2).with_filter(volume(80)),
        ]));
        assert_eq!(
            plan.graph().unwrap(),
            "[0:1]volume=1.20[a1_0];[0:2]volume=0.80[a2_0]"
        );
        let maps: Vec<String> = plan.outputs().iter().map(StreamRef::as_map).collect();
        assert_eq!(maps, vec!["[a1_0]", "[a2_0]"]);
    }

    #[test]
    fn test_merge_mixes_flagged_tracks() {
        let plan = AudioMapper::plan(&clip_with(vec![
            AudioTrackSetting::new(1).merged().with_filter(volume(150)),
            AudioTrackSetting::new(2).merged(),
        ]));
        assert_eq!(
            plan.graph().unwrap(),
            "[0:1]volume=1.50[a1_0];[a1_0][0:2]amix=inputs=2[aout]"
        );
        assert_eq!(plan.outputs(), &[StreamRef::Label("aout".to_string())]);
    }

    #[test]
    fn test_merge_with_single_enabled_track_has_no_effect() {
        let merged = AudioMapper::plan(&clip_with(vec![
            AudioTrackSetting::new(1).merged(),
            AudioTrackSetting::new(2).merged().disabled(),
        ]));
        let plain = AudioMapper::plan(&clip_with(vec![AudioTrackSetting::new(1)]));
        assert_eq!(merged, plain);
    }

    #[test]
    fn test_unflagged_tracks_stay_independent_next_to_mix() {
        let plan = AudioMapper::plan(&clip_with(vec![
            AudioTrackSetting::new(1),
            AudioTrackSetting::new(2).merged(),
            AudioTrackSetting::new(3).merged(),
        ]));
        let maps: Vec<String> = plan.outputs().iter().map(StreamRef::as_map).collect();
        assert_eq!(maps, vec!["0:1", "[aout]"]);
        assert_eq!(plan.graph().unwrap(), "[0:2][0:3]amix=inputs=2[aout]");
    }
}
