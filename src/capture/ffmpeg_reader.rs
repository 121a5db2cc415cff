use super::{FrameSource, VideoInfo};
use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

/// Decodes a video file into RGB24 frames through an `ffmpeg` subprocess
pub struct FfmpegReader {
    child: Child,
    stdout: ChildStdout,
    info: VideoInfo,
    frames_read: u64,
    finished: bool,
}

impl FfmpegReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let info = read_stream_info(path)?;

        tracing::info!(
            "Opening {} ({}x{} @ {:.2} fps)",
            path.display(),
            info.width,
            info.height,
            info.fps
        );

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .context("Failed to spawn ffmpeg decoder")?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Failed to open ffmpeg decoder stdout"))?;

        Ok(Self {
            child,
            stdout,
            info,
            frames_read: 0,
            finished: false,
        })
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let status = self.child.wait().context("Failed to wait on ffmpeg decoder")?;
        if !status.success() {
            bail!("ffmpeg decoder exited with {}", status);
        }

        tracing::debug!("Decoder finished after {} frames", self.frames_read);
        Ok(())
    }
}

impl FrameSource for FfmpegReader {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.finished {
            return Ok(None);
        }

        match read_frame(&mut self.stdout, &self.info)? {
            Some(frame) => {
                self.frames_read += 1;
                Ok(Some(frame))
            }
            None => {
                self.finish()?;
                Ok(None)
            }
        }
    }

    fn info(&self) -> VideoInfo {
        self.info
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Read one packed RGB24 frame. A clean end of stream yields `None`,
/// a partial frame is an error.
pub(crate) fn read_frame<R: Read>(reader: &mut R, info: &VideoInfo) -> Result<Option<RgbImage>> {
    let frame_len = info.width as usize * info.height as usize * 3;
    let mut buffer = vec![0u8; frame_len];

    let mut filled = 0;
    while filled < frame_len {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("Failed to read frame from decoder"),
        }
    }

    if filled == 0 {
        return Ok(None);
    }
    if filled < frame_len {
        bail!("Truncated frame: got {} of {} bytes", filled, frame_len);
    }

    let frame = RgbImage::from_raw(info.width, info.height, buffer)
        .context("Decoded buffer does not match frame size")?;
    Ok(Some(frame))
}

fn read_stream_info(path: &Path) -> Result<VideoInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .context("Failed to run ffprobe")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ffprobe failed on {}: {}", path.display(), stderr.trim());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_stream_info(&stdout)
        .with_context(|| format!("Unexpected ffprobe output for {}", path.display()))
}

/// Parse `width,height,rate` as printed by `ffprobe -of csv=p=0`
pub fn parse_stream_info(output: &str) -> Result<VideoInfo> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| anyhow!("No video stream found"))?;

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [width, height, rate] = fields.as_slice() else {
        bail!("Expected width,height,rate but got {:?}", line);
    };

    let width: u32 = width.parse().context("Invalid width")?;
    let height: u32 = height.parse().context("Invalid height")?;
    if width == 0 || height == 0 {
        bail!("Video has empty dimensions {}x{}", width, height);
    }

    Ok(VideoInfo {
        width,
        height,
        fps: parse_frame_rate(rate)?,
    })
}

/// Parse a frame rate written either as a fraction (`30000/1001`) or a number
pub fn parse_frame_rate(rate: &str) -> Result<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().context("Invalid frame rate numerator")?;
            let den: f64 = den.trim().parse().context("Invalid frame rate denominator")?;
            if den == 0.0 {
                bail!("Frame rate {:?} has a zero denominator", rate);
            }
            num / den
        }
        None => rate.trim().parse().context("Invalid frame rate")?,
    };

    if !(fps.is_finite() && fps > 0.0) {
        bail!("Frame rate {:?} is not positive", rate);
    }
    Ok(fps)
}
