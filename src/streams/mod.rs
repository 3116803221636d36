//! Stream handling and filter-graph construction
//!
//! Builds the video filter chain and the per-track audio chains for a clip.
//! Everything here is pure: the same clip always yields the same graph text.

use serde::Serialize;

use crate::domain::model::ClipSpec;

pub mod audio_mapper;
pub mod mapper;

pub use audio_mapper::AudioMapper;
pub use mapper::VideoMapper;

/// Input file index used in every stream reference
pub const INPUT_FILE: usize = 0;

/// Output label of the video filter chain
pub const VIDEO_OUTPUT_LABEL: &str = "vout";

/// Output label of the audio mixdown
pub const AUDIO_MIX_LABEL: &str = "aout";

/// A stream an output is read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StreamRef {
    /// Raw input stream, e.g. `0:1` or `0:v:0`
    Input(String),
    /// Output pad of a filter chain
    Label(String),
}

impl StreamRef {
    /// Absolute input stream by index
    pub fn input_stream(index: usize) -> Self {
        StreamRef::Input(format!("{}:{}", INPUT_FILE, index))
    }

    /// Form used as a filter-graph pad, always bracketed
    pub fn as_pad(&self) -> String {
        match self {
            StreamRef::Input(spec) | StreamRef::Label(spec) => format!("[{}]", spec),
        }
    }

    /// Form passed to `-map`
    pub fn as_map(&self) -> String {
        match self {
            StreamRef::Input(spec) => spec.clone(),
            StreamRef::Label(label) => format!("[{}]", label),
        }
    }
}

/// Video filter chain for one clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoFilterPlan {
    /// Filter terms in application order (fps, scale, crop)
    pub terms: Vec<String>,
}

impl VideoFilterPlan {
    /// Comma-joined chain, empty when the stream is mapped directly
    pub fn fragment(&self) -> String {
        self.terms.join(",")
    }

    pub fn is_direct(&self) -> bool {
        self.terms.is_empty()
    }

    /// Complete `-filter_complex` graph, `None` for a direct mapping
    pub fn graph(&self) -> Option<String> {
        if self.is_direct() {
            return None;
        }
        Some(format!(
            "{}{}[{}]",
            VideoMapper::source_stream().as_pad(),
            self.fragment(),
            VIDEO_OUTPUT_LABEL
        ))
    }

    /// Stream the output video is mapped from
    pub fn output(&self) -> StreamRef {
        if self.is_direct() {
            VideoMapper::source_stream()
        } else {
            StreamRef::Label(VIDEO_OUTPUT_LABEL.to_string())
        }
    }
}

/// Audio routing for one clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AudioPlan {
    /// No enabled tracks: the output carries no audio
    Disabled,
    /// One or more output streams
    Streams {
        /// Filter-graph segments, joined with `;`
        segments: Vec<String>,
        /// Output streams in order
        outputs: Vec<StreamRef>,
    },
}

impl AudioPlan {
    /// Complete `-filter_complex` graph, `None` when every output is a raw stream
    pub fn graph(&self) -> Option<String> {
        match self {
            AudioPlan::Streams { segments, .. } if !segments.is_empty() => {
                Some(segments.join(";"))
            }
            _ => None,
        }
    }

    pub fn outputs(&self) -> &[StreamRef] {
        match self {
            AudioPlan::Disabled => &[],
            AudioPlan::Streams { outputs, .. } => outputs,
        }
    }
}

/// Video and audio chains for a clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterChains {
    pub video: VideoFilterPlan,
    pub audio: AudioPlan,
}

/// Computes every filter-graph fragment a clip needs
pub struct FilterChainBuilder;

impl FilterChainBuilder {
    pub fn build(clip: &ClipSpec) -> FilterChains {
        FilterChains {
            video: VideoMapper::plan(clip),
            audio: AudioMapper::plan(clip),
        }
    }
}
