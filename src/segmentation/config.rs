use serde::Deserialize;

/// Largest accepted Gaussian kernel size for the mask blur.
pub const MAX_BLUR: u32 = 255;

/// Tunable thresholds for [`ContourSegmenter`](super::ContourSegmenter).
///
/// The defaults were tuned against footage of produce on a kitchen scale.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// Grayscale difference from the base frame above which a pixel is kept.
    pub background_subtraction_threshold: u8,
    /// Canny hysteresis low threshold.
    pub canny_low: f32,
    /// Canny hysteresis high threshold.
    pub canny_high: f32,
    /// Gaussian kernel size used to soften the mask. Must be odd and at most [`MAX_BLUR`].
    pub blur: u32,
    pub mask_dilate_iter: u8,
    pub mask_erode_iter: u8,
    /// Contours at or below this fraction of the frame area are discarded.
    pub min_contour_area_proportion: f64,
    /// Contours at or above this fraction of the frame area are discarded.
    pub max_contour_area_proportion: f64,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            background_subtraction_threshold: 30,
            canny_low: 15.0,
            canny_high: 150.0,
            blur: 21,
            mask_dilate_iter: 5,
            mask_erode_iter: 5,
            min_contour_area_proportion: 0.0001,
            max_contour_area_proportion: 0.95,
        }
    }
}

impl ContourConfig {
    /// Check ordering and range constraints between the parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canny_low.is_nan() || self.canny_low < 0.0 {
            return Err(ConfigError::NegativeCannyThreshold(self.canny_low));
        }
        if self.canny_high.is_nan() || self.canny_low >= self.canny_high {
            return Err(ConfigError::CannyThresholdOrder {
                low: self.canny_low,
                high: self.canny_high,
            });
        }
        if self.blur == 0 {
            return Err(ConfigError::ZeroBlur);
        }
        if self.blur % 2 == 0 {
            return Err(ConfigError::EvenBlur(self.blur));
        }
        if self.blur > MAX_BLUR {
            return Err(ConfigError::BlurTooLarge(self.blur));
        }

        let in_unit_range = |p: f64| (0.0..=1.0).contains(&p);
        for proportion in [
            self.min_contour_area_proportion,
            self.max_contour_area_proportion,
        ] {
            if !in_unit_range(proportion) {
                return Err(ConfigError::ContourProportionRange(proportion));
            }
        }
        if self.min_contour_area_proportion >= self.max_contour_area_proportion {
            return Err(ConfigError::ContourProportionOrder {
                min: self.min_contour_area_proportion,
                max: self.max_contour_area_proportion,
            });
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("canny_low must be non-negative, got {0}")]
    NegativeCannyThreshold(f32),
    #[error("canny_low ({low}) must be below canny_high ({high})")]
    CannyThresholdOrder { low: f32, high: f32 },
    #[error("blur kernel size must be positive")]
    ZeroBlur,
    #[error("blur kernel size must be odd, got {0}")]
    EvenBlur(u32),
    #[error("blur kernel size {0} exceeds the maximum of 255")]
    BlurTooLarge(u32),
    #[error("unknown log level {0:?}")]
    LogLevel(String),
    #[error("contour area proportion {0} is outside [0, 1]")]
    ContourProportionRange(f64),
    #[error("min_contour_area_proportion ({min}) must be below max_contour_area_proportion ({max})")]
    ContourProportionOrder { min: f64, max: f64 },
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}
