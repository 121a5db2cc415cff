use anyhow::{bail, Context, Result};
use clap::Parser;
use produce_matte::capture::{FfmpegReader, FrameSource};
use produce_matte::config::AppConfig;
use produce_matte::output::{FfmpegWriter, FrameSink};
use produce_matte::segmentation::{self, Method, MethodSegmenter, Segmenter};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about = "Segment produce on a scale", long_about = None)]
struct Args {
    /// Path to mp4 video to segment
    #[arg(long, default_value = "video_1.mp4")]
    input_path: PathBuf,

    /// Where to write the segmented video
    /// Defaults to the input path with `_processed` appended
    #[arg(long)]
    output_path: Option<PathBuf>,

    /// Segmentation method
    #[arg(long, value_enum, default_value_t = Method::Contour)]
    method: Method,

    /// TOML file with segmenter thresholds and logging level
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Write the alpha matte (grayscale) instead of the segmented frames
    #[arg(long)]
    show_matte: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::default(),
    };

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        config.logging.max_level()?
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    validate_input_path(&args.input_path)?;
    let output_path = match &args.output_path {
        Some(path) => path.clone(),
        None => default_output_path(&args.input_path)?,
    };
    ensure_parent_dir(&output_path)?;

    tracing::info!("Using input at {}", args.input_path.display());
    tracing::info!("Output will be saved to {}", output_path.display());

    let mut segmenter = segmentation::create_segmenter(args.method, &config.contour)
        .context("Failed to create segmenter")?;

    let mut source = FfmpegReader::open(&args.input_path)
        .with_context(|| format!("Failed to open {}", args.input_path.display()))?;
    let info = source.info();

    let mut sink = FfmpegWriter::new(&output_path, info.width, info.height, info.fps)
        .context("Failed to initialize video output")?;

    run_pipeline(&mut source, &mut sink, &mut segmenter, args.show_matte)?;

    Ok(())
}

fn validate_input_path(path: &Path) -> Result<()> {
    if path.extension().and_then(|ext| ext.to_str()) != Some("mp4") {
        bail!("Need to specify an mp4 input file, got {}", path.display());
    }
    Ok(())
}

/// `dir/name.mp4` -> `dir/name_processed.mp4`
fn default_output_path(input: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("Input path {} has no file name", input.display()))?;
    Ok(input.with_file_name(format!("{}_processed.mp4", stem)))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tracing::info!("Creating output directory {}", parent.display());
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Segment every frame of `source` into `sink`, in order.
/// Returns the number of frames written.
fn run_pipeline<S, O>(
    source: &mut S,
    sink: &mut O,
    segmenter: &mut MethodSegmenter,
    show_matte: bool,
) -> Result<u64>
where
    S: FrameSource,
    O: FrameSink,
{
    let info = source.info();
    let (width, height) = sink.resolution();
    if (info.width, info.height) != (width, height) {
        bail!(
            "Output resolution {}x{} does not match input {}x{}",
            width,
            height,
            info.width,
            info.height
        );
    }

    let mut frame_count = 0u64;
    let mut total_read_time = Duration::ZERO;
    let mut total_segment_time = Duration::ZERO;
    let mut total_write_time = Duration::ZERO;

    tracing::info!("Starting segmentation, show_matte={}", show_matte);

    loop {
        let read_start = Instant::now();
        let Some(frame) = source.next_frame().context("Failed to read frame")? else {
            break;
        };
        total_read_time += read_start.elapsed();

        let segment_start = Instant::now();
        let output_frame = if show_matte {
            let (_, matte) = segmenter
                .segment_with_matte(&frame)
                .with_context(|| format!("Failed to segment frame {}", frame_count))?;
            segmentation::matte_to_rgb(&matte)
        } else {
            segmenter
                .segment_frame(&frame)
                .with_context(|| format!("Failed to segment frame {}", frame_count))?
        };
        total_segment_time += segment_start.elapsed();

        let write_start = Instant::now();
        sink.write_frame(&output_frame)
            .with_context(|| format!("Failed to write frame {}", frame_count))?;
        total_write_time += write_start.elapsed();

        if frame_count % 100 == 0 {
            let processed = (frame_count + 1) as f64;
            tracing::info!(
                "Frames processed: {}: read={:.1}ms, segment={:.1}ms, write={:.1}ms",
                frame_count,
                total_read_time.as_secs_f64() * 1000.0 / processed,
                total_segment_time.as_secs_f64() * 1000.0 / processed,
                total_write_time.as_secs_f64() * 1000.0 / processed
            );
        }
        frame_count += 1;
    }

    sink.finish().context("Failed to finalize output video")?;
    tracing::info!("Segmented {} frames", frame_count);

    Ok(frame_count)
}
