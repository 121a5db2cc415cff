use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::filter::separable_filter_equal;
use imageproc::point::Point;

/// Gaussian blur with an explicit odd kernel size
///
/// The standard deviation is derived from the kernel size as
/// `0.3 * ((size - 1) / 2 - 1) + 0.8`, so a larger kernel always spreads
/// further. Filtering runs in `f32` and is rounded back to 8 bits.
pub fn gaussian_blur(image: &GrayImage, kernel_size: u32) -> GrayImage {
    let _span = tracing::debug_span!("gaussian_blur", kernel_size).entered();

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let kernel = gaussian_kernel(kernel_size);
    let widened: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(width, height, |x, y| Luma([f32::from(image.get_pixel(x, y)[0])]));
    let blurred = separable_filter_equal(&widened, &kernel);

    GrayImage::from_fn(width, height, |x, y| {
        Luma([blurred.get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8])
    })
}

/// Normalized 1-D Gaussian weights for a kernel of `size` taps
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let radius = i64::from(size / 2);

    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| {
            let offset = i as f32;
            (-(offset * offset) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);

    kernel
}

/// Rec.601 luma in the fixed-point form used by common video tooling:
/// `(4899 R + 9617 G + 1868 B + 8192) >> 14`
pub fn luma_601(frame: &RgbImage) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let [r, g, b] = frame.get_pixel(x, y).0;
        let weighted = 4899 * u32::from(r) + 9617 * u32::from(g) + 1868 * u32::from(b);
        Luma([((weighted + 8192) >> 14) as u8])
    })
}

/// Area enclosed by a closed polygon, via the shoelace formula
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
        .sum();

    twice_area.abs() as f64 / 2.0
}

/// Convert matte to grayscale RGB image for visualization
pub fn matte_to_rgb(matte: &GrayImage) -> RgbImage {
    RgbImage::from_fn(matte.width(), matte.height(), |x, y| {
        let value = matte.get_pixel(x, y)[0];
        image::Rgb([value, value, value])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn transitional_pixels(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p[0] != 0 && p[0] != 255).count()
    }

    fn square_mask() -> GrayImage {
        GrayImage::from_fn(64, 64, |x, y| {
            if (20..44).contains(&x) && (20..44).contains(&y) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(21);
        assert_eq!(kernel.len(), 21);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..10 {
            assert!((kernel[i] - kernel[20 - i]).abs() < 1e-7);
        }
        assert!(kernel[10] > kernel[9]);
    }

    #[test]
    fn unit_kernel_is_identity() {
        let mask = square_mask();
        assert_eq!(gaussian_blur(&mask, 1), mask);
    }

    #[test]
    fn uniform_image_is_unchanged() {
        let flat = GrayImage::from_pixel(16, 9, Luma([77]));
        assert_eq!(gaussian_blur(&flat, 21), flat);
    }

    #[test]
    fn larger_kernel_widens_transition_band() {
        let mask = square_mask();
        let narrow = transitional_pixels(&gaussian_blur(&mask, 5));
        let medium = transitional_pixels(&gaussian_blur(&mask, 11));
        let wide = transitional_pixels(&gaussian_blur(&mask, 21));

        assert_eq!(transitional_pixels(&mask), 0);
        assert!(narrow > 0);
        assert!(medium > narrow, "{medium} <= {narrow}");
        assert!(wide > medium, "{wide} <= {medium}");
    }

    #[test]
    fn blur_of_single_pixel_spreads_to_neighbours() {
        let mut dot = GrayImage::new(9, 9);
        dot.put_pixel(4, 4, Luma([255]));
        let blurred = gaussian_blur(&dot, 5);
        assert_eq!(blurred.dimensions(), (9, 9));
        assert!(blurred.get_pixel(4, 4)[0] < 255);
        assert!(blurred.get_pixel(5, 4)[0] > 0);
        assert!(blurred.get_pixel(4, 4)[0] > blurred.get_pixel(5, 4)[0]);
        assert_eq!(blurred.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn huge_kernel_weights_stay_finite() {
        let kernel = gaussian_kernel(100_001);
        assert_eq!(kernel.len(), 100_001);
        assert!(kernel.iter().all(|w| w.is_finite() && *w >= 0.0));
    }

    #[test]
    fn luma_uses_rec601_weights() {
        let frame = RgbImage::from_fn(4, 1, |x, _| match x {
            0 => Rgb([120, 0, 0]),
            1 => Rgb([0, 120, 0]),
            2 => Rgb([0, 0, 120]),
            _ => Rgb([90, 90, 90]),
        });
        let luma = luma_601(&frame);
        assert_eq!(luma.get_pixel(0, 0)[0], 36);
        assert_eq!(luma.get_pixel(1, 0)[0], 70);
        assert_eq!(luma.get_pixel(2, 0)[0], 14);
        // Weights sum to one, so grays map to themselves
        assert_eq!(luma.get_pixel(3, 0)[0], 90);
        let white = luma_601(&RgbImage::from_pixel(1, 1, Rgb([255, 255, 255])));
        assert_eq!(white.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn shoelace_area_of_rectangle_border() {
        // Pixel centres on the border of a 16x16 block enclose 15x15
        let mut points = Vec::new();
        for x in 0..16 {
            points.push(Point::new(x, 0));
        }
        for y in 1..16 {
            points.push(Point::new(15, y));
        }
        for x in (0..15).rev() {
            points.push(Point::new(x, 15));
        }
        for y in (1..15).rev() {
            points.push(Point::new(0, y));
        }
        assert_eq!(contour_area(&points), 225.0);

        points.reverse();
        assert_eq!(contour_area(&points), 225.0);
    }

    #[test]
    fn degenerate_contours_have_no_area() {
        assert_eq!(contour_area(&[]), 0.0);
        assert_eq!(contour_area(&[Point::new(3, 3)]), 0.0);
        assert_eq!(contour_area(&[Point::new(0, 0), Point::new(5, 5)]), 0.0);
    }

    #[test]
    fn matte_preview_replicates_channels() {
        let matte = GrayImage::from_fn(4, 2, |x, _| Luma([x as u8 * 60]));
        let rgb = matte_to_rgb(&matte);
        assert_eq!(rgb.dimensions(), (4, 2));
        assert_eq!(rgb.get_pixel(3, 1).0, [180, 180, 180]);
    }
}
