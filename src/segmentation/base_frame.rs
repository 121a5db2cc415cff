use image::RgbImage;

/// The static background reference for one video session.
///
/// Filled by the first frame of the session and left untouched afterwards
/// until [`BaseFrame::reset`] is called.
#[derive(Debug, Default)]
pub struct BaseFrame {
    frame: Option<RgbImage>,
}

impl BaseFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stored base frame, capturing a copy of `frame` if none is set yet.
    pub fn get_or_capture(&mut self, frame: &RgbImage) -> &RgbImage {
        if self.frame.is_none() {
            let (width, height) = frame.dimensions();
            tracing::debug!("Capturing {}x{} base frame", width, height);
        }
        self.frame.get_or_insert_with(|| frame.clone())
    }

    pub fn get(&self) -> Option<&RgbImage> {
        self.frame.as_ref()
    }

    /// Forget the stored frame so the next call captures a new one.
    pub fn reset(&mut self) {
        self.frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn captures_only_once() {
        let mut base = BaseFrame::new();
        assert!(base.get().is_none());

        let first = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let second = RgbImage::from_pixel(4, 4, Rgb([200, 200, 200]));

        assert_eq!(base.get_or_capture(&first), &first);
        assert_eq!(base.get_or_capture(&second), &first);
        assert_eq!(base.get(), Some(&first));
    }

    #[test]
    fn reset_allows_recapture() {
        let mut base = BaseFrame::new();
        let first = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let second = RgbImage::from_pixel(4, 4, Rgb([200, 200, 200]));

        base.get_or_capture(&first);
        base.reset();
        assert!(base.get().is_none());

        assert_eq!(base.get_or_capture(&second), &second);
    }
}
