use anyhow::Result;
use image::{GrayImage, RgbImage};

/// Alpha matte: 0 = background, 255 = foreground, smoothed in between.
/// Dimensions match the input frame dimensions
pub type Matte = GrayImage;

/// Trait for per-frame segmentation strategies
/// Every strategy takes one frame and returns one frame of the same shape
pub trait Segmenter {
    /// Segment a frame, returning it with the background blacked out
    ///
    /// # Arguments
    /// * `frame` - Input RGB frame
    ///
    /// # Returns
    /// * RGB frame with identical width and height
    fn segment_frame(&mut self, frame: &RgbImage) -> Result<RgbImage>;

    /// Reset internal state carried between frames
    ///
    /// Call this before starting a new, unrelated video
    fn reset_state(&mut self) {
        // Default implementation: no-op for stateless strategies
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    #[error("frame is {actual:?} but the session base frame is {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}
