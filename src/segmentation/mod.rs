mod base_frame;
mod config;
mod contour;
mod filters;
pub mod types;

pub use base_frame::BaseFrame;
pub use config::{ConfigError, ContourConfig, MAX_BLUR};
pub use contour::ContourSegmenter;
pub use filters::{contour_area, gaussian_blur, luma_601, matte_to_rgb};
pub use types::{Matte, SegmentError, Segmenter};

use anyhow::Result;
use image::RgbImage;

/// Segmentation methods selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Method {
    /// Base frame subtraction followed by edge/contour masking
    Contour,
}

/// A constructed segmenter, one variant per [`Method`]
pub enum MethodSegmenter {
    Contour(ContourSegmenter),
}

impl MethodSegmenter {
    /// Segment a frame, also returning the alpha matte that was applied
    pub fn segment_with_matte(&mut self, frame: &RgbImage) -> Result<(RgbImage, Matte)> {
        match self {
            MethodSegmenter::Contour(segmenter) => Ok(segmenter.segment_with_matte(frame)?),
        }
    }
}

impl Segmenter for MethodSegmenter {
    fn segment_frame(&mut self, frame: &RgbImage) -> Result<RgbImage> {
        match self {
            MethodSegmenter::Contour(segmenter) => segmenter.segment_frame(frame),
        }
    }

    fn reset_state(&mut self) {
        match self {
            MethodSegmenter::Contour(segmenter) => segmenter.reset_state(),
        }
    }
}

/// Build the segmenter for `method`
pub fn create_segmenter(method: Method, contour: &ContourConfig) -> Result<MethodSegmenter> {
    let segmenter = match method {
        Method::Contour => MethodSegmenter::Contour(ContourSegmenter::new(contour.clone())?),
    };
    tracing::info!("Using {:?} segmentation", method);
    Ok(segmenter)
}
