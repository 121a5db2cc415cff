mod ffmpeg_reader;

pub use ffmpeg_reader::{parse_frame_rate, parse_stream_info, FfmpegReader};

use anyhow::Result;
use image::RgbImage;

/// Stream properties needed to configure the output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Trait for sequential frame sources
pub trait FrameSource {
    /// Read the next frame, or `None` once the source is exhausted
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Get the properties of the stream
    fn info(&self) -> VideoInfo;
}
