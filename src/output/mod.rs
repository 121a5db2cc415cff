mod ffmpeg_writer;

pub use ffmpeg_writer::FfmpegWriter;

use anyhow::Result;
use image::RgbImage;

/// Trait for output destinations
pub trait FrameSink {
    /// Write a frame to the output
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Flush everything written so far and close the output
    fn finish(&mut self) -> Result<()>;

    /// Get the expected output resolution
    fn resolution(&self) -> (u32, u32);
}
