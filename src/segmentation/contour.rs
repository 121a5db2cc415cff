use super::base_frame::BaseFrame;
use super::config::{ConfigError, ContourConfig};
use super::filters::{contour_area, gaussian_blur, luma_601};
use super::types::{Matte, SegmentError, Segmenter};
use anyhow::Result;
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_polygon_mut;
use imageproc::edges::canny;
use imageproc::geometry::convex_hull;
use imageproc::morphology::{dilate, erode};
use imageproc::point::Point;

/// Background-difference + edge/contour foreground segmentation
///
/// The first frame of a session is assumed to be pure background and is kept
/// as the base frame. Every frame then goes through:
/// 1. Base frame subtraction on grayscale intensity
/// 2. Canny edge detection, closed with one dilate/erode pass
/// 3. Contour tracing, keeping contours strictly inside the area bounds
/// 4. Convex hull fill of the kept contours into a mask
/// 5. Mask dilation, erosion and Gaussian softening into a matte
/// 6. Alpha blending of the subtracted frame towards black
///
/// Call [`ContourSegmenter::reset_base_frame`] before reusing an instance on
/// another video.
pub struct ContourSegmenter {
    config: ContourConfig,
    base: BaseFrame,
}

impl Default for ContourSegmenter {
    fn default() -> Self {
        Self {
            config: ContourConfig::default(),
            base: BaseFrame::new(),
        }
    }
}

impl ContourSegmenter {
    /// Create a segmenter, rejecting inconsistent thresholds up front
    pub fn new(config: ContourConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::debug!("Contour segmenter configured: {:?}", config);

        Ok(Self {
            config,
            base: BaseFrame::new(),
        })
    }

    pub fn config(&self) -> &ContourConfig {
        &self.config
    }

    /// Re-tune between frames. The base frame is kept.
    pub fn set_config(&mut self, config: ContourConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn base_frame(&self) -> Option<&RgbImage> {
        self.base.get()
    }

    /// Forget the base frame so the next frame becomes the new background
    pub fn reset_base_frame(&mut self) {
        tracing::info!("Resetting contour segmenter base frame");
        self.base.reset();
    }

    /// Segment a frame and also return the matte used for compositing
    pub fn segment_with_matte(
        &mut self,
        frame: &RgbImage,
    ) -> Result<(RgbImage, Matte), SegmentError> {
        let _span = tracing::debug_span!("contour_segment").entered();

        let base = self.base.get_or_capture(frame);
        if base.dimensions() != frame.dimensions() {
            return Err(SegmentError::DimensionMismatch {
                expected: base.dimensions(),
                actual: frame.dimensions(),
            });
        }

        let subtracted =
            subtract_background(frame, base, self.config.background_subtraction_threshold);
        let edges = detect_edges(&subtracted, self.config.canny_low, self.config.canny_high);
        let contours = filter_contours(&edges, &self.config);
        let mask = fill_convex_hulls(edges.dimensions(), &contours);
        let matte = refine_mask(&mask, &self.config);
        let output = composite(&subtracted, &matte);

        Ok((output, matte))
    }
}

impl Segmenter for ContourSegmenter {
    fn segment_frame(&mut self, frame: &RgbImage) -> Result<RgbImage> {
        let (output, _matte) = self.segment_with_matte(frame)?;
        Ok(output)
    }

    fn reset_state(&mut self) {
        self.reset_base_frame();
    }
}

/// Keep pixels whose grayscale value differs from the base by more than
/// `threshold`, zero everything else
fn subtract_background(frame: &RgbImage, base: &RgbImage, threshold: u8) -> RgbImage {
    let _span = tracing::debug_span!("background_subtraction").entered();

    let frame_gray = luma_601(frame);
    let base_gray = luma_601(base);

    RgbImage::from_fn(frame.width(), frame.height(), |x, y| {
        let diff = frame_gray.get_pixel(x, y)[0].abs_diff(base_gray.get_pixel(x, y)[0]);
        if diff > threshold {
            *frame.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

fn detect_edges(frame: &RgbImage, low: f32, high: f32) -> GrayImage {
    let _span = tracing::debug_span!("edge_detection").entered();

    let gray = luma_601(frame);
    let edges = canny(&gray, low, high);

    // Close single-pixel gaps without growing the edges
    erode(&dilate(&edges, Norm::LInf, 1), Norm::LInf, 1)
}

/// Trace every border in the edge map and keep those whose area lies
/// strictly between the configured fractions of the frame area
fn filter_contours(edges: &GrayImage, config: &ContourConfig) -> Vec<Vec<Point<i32>>> {
    let _span = tracing::debug_span!("contour_filter").entered();

    let (width, height) = edges.dimensions();
    let frame_area = f64::from(width) * f64::from(height);
    let min_area = config.min_contour_area_proportion * frame_area;
    let max_area = config.max_contour_area_proportion * frame_area;

    let contours = find_contours::<i32>(edges);
    let traced = contours.len();

    let kept: Vec<Vec<Point<i32>>> = contours
        .into_iter()
        .map(|contour| contour.points)
        .filter(|points| {
            let area = contour_area(points);
            area > min_area && area < max_area
        })
        .collect();

    tracing::debug!("Kept {} of {} contours", kept.len(), traced);

    kept
}

/// Paint the convex hull of each contour at full intensity.
/// Concave parts of a contour are filled in as well.
fn fill_convex_hulls(dimensions: (u32, u32), contours: &[Vec<Point<i32>>]) -> GrayImage {
    let (width, height) = dimensions;
    let mut mask = GrayImage::new(width, height);

    for points in contours {
        let mut hull = convex_hull(points.as_slice());
        if hull.len() > 1 && hull.first() == hull.last() {
            hull.pop();
        }

        if hull.len() >= 3 {
            draw_polygon_mut(&mut mask, &hull, Luma([255]));
        } else {
            for point in hull {
                if (0..width as i32).contains(&point.x) && (0..height as i32).contains(&point.y) {
                    mask.put_pixel(point.x as u32, point.y as u32, Luma([255]));
                }
            }
        }
    }

    mask
}

/// Close holes and merge nearby blobs, then soften into a continuous matte
fn refine_mask(mask: &GrayImage, config: &ContourConfig) -> Matte {
    let _span = tracing::debug_span!("mask_refinement").entered();

    let dilated = match config.mask_dilate_iter {
        0 => mask.clone(),
        k => dilate(mask, Norm::LInf, k),
    };
    let eroded = match config.mask_erode_iter {
        0 => dilated,
        k => erode(&dilated, Norm::LInf, k),
    };

    gaussian_blur(&eroded, config.blur)
}

/// Blend each pixel towards black by `1 - matte / 255`, truncating to 8 bits
fn composite(frame: &RgbImage, matte: &Matte) -> RgbImage {
    RgbImage::from_fn(frame.width(), frame.height(), |x, y| {
        let alpha = f32::from(matte.get_pixel(x, y)[0]) / 255.0;
        let pixel = frame.get_pixel(x, y);
        Rgb(pixel.0.map(|channel| (alpha * f32::from(channel)) as u8))
    })
}
