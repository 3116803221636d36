//! Video filter chain construction

use crate::domain::model::{ClipSpec, FrameRate, Resolution};
use crate::streams::{StreamRef, VideoFilterPlan, INPUT_FILE};

/// Frame rates closer than this are treated as equal
const FPS_TOLERANCE: f64 = 1e-3;

/// Builds the fps/scale/crop chain for the clip's video stream
pub struct VideoMapper;

impl VideoMapper {
    /// First video stream of the input
    pub fn source_stream() -> StreamRef {
        StreamRef::Input(format!("{}:v:0", INPUT_FILE))
    }

    pub fn plan(clip: &ClipSpec) -> VideoFilterPlan {
        let mut terms = Vec::with_capacity(3);

        if let FrameRate::Target(fps) = clip.frame_rate {
            if (fps - clip.source.frame_rate).abs() > FPS_TOLERANCE {
                terms.push(format!("fps={}", fps));
            }
        }

        if let Resolution::Target { width, height } = clip.resolution {
            if width != clip.source.width || height != clip.source.height {
                terms.push(format!("scale={}:{}", width, height));
            }
        }

        if let Some(crop) = clip.crop {
            terms.push(format!(
                "crop={}:{}:{}:{}",
                crop.width, crop.height, crop.x, crop.y
            ));
        }

        VideoFilterPlan { terms }
    }
}
