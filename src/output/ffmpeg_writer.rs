use super::FrameSink;
use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

/// Encodes RGB24 frames into an MP4 file through an `ffmpeg` subprocess
pub struct FfmpegWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    output_path: PathBuf,
    width: u32,
    height: u32,
    frame_count: u64,
}

impl FfmpegWriter {
    pub fn new<P: AsRef<Path>>(output_path: P, width: u32, height: u32, fps: f64) -> Result<Self> {
        let output_path = output_path.as_ref().to_path_buf();
        tracing::info!(
            "Encoding to {} ({}x{} @ {:.2} fps)",
            output_path.display(),
            width,
            height,
            fps
        );

        let mut child = Command::new("ffmpeg")
            .args(encoder_args(&output_path, width, height, fps))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .context("Failed to spawn ffmpeg encoder")?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Failed to open ffmpeg encoder stdin"))?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            output_path,
            width,
            height,
            frame_count: 0,
        })
    }
}

/// Arguments for an MPEG-4 Part 2 encode of raw RGB24 frames read from stdin
fn encoder_args(output_path: &Path, width: u32, height: u32, fps: f64) -> Vec<OsString> {
    let size = format!("{}x{}", width, height);
    let rate = fps.to_string();

    let mut args: Vec<OsString> = [
        "-v",
        "error",
        "-y",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
        size.as_str(),
        "-r",
        rate.as_str(),
        "-i",
        "pipe:0",
        "-c:v",
        "mpeg4",
        "-q:v",
        "2",
        "-pix_fmt",
        "yuv420p",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(output_path.as_os_str().to_owned());

    args
}

impl FrameSink for FfmpegWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            bail!(
                "Frame is {:?} but the output is {}x{}",
                frame.dimensions(),
                self.width,
                self.height
            );
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| anyhow!("Encoder already finished"))?;
        stdin
            .write_all(frame.as_raw())
            .context("Failed to write frame to ffmpeg encoder")?;

        self.frame_count += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // Closing stdin tells ffmpeg there are no more frames
        let Some(stdin) = self.stdin.take() else {
            return Ok(());
        };
        drop(stdin);

        let status = self.child.wait().context("Failed to wait on ffmpeg encoder")?;
        if !status.success() {
            bail!("ffmpeg encoder exited with {}", status);
        }

        tracing::info!(
            "Wrote {} frames to {}",
            self.frame_count,
            self.output_path.display()
        );
        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if let Some(stdin) = self.stdin.take() {
            drop(stdin);
            let _ = self.child.wait();
        }
    }
}
