//! Image preprocessing for OCR.

use image::{DynamicImage, GenericImageView, GrayImage};
use tracing::debug;

/// Converts rendered pages to grayscale and bounds their size.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    /// Maximum image dimension.
    max_size: u32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self { max_size: 4096 }
    }

    /// Set maximum image dimension.
    pub fn with_max_size(mut self, size: u32) -> Self {
        self.max_size = size.max(1);
        self
    }

    /// Grayscale page image no larger than `max_size` on its longer side.
    pub fn prepare(&self, image: &DynamicImage) -> GrayImage {
        let (width, height) = image.dimensions();
        let longest = width.max(height);

        if longest <= self.max_size {
            return image.to_luma8();
        }

        let (new_width, new_height) = self.calculate_resize_dimensions(width, height);
        debug!(
            "Downscaling page {}x{} -> {}x{}",
            width, height, new_width, new_height
        );
        image
            .resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
            .to_luma8()
    }

    fn calculate_resize_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = self.max_size as f32 / width.max(height) as f32;
        let new_width = ((width as f32 * scale).round() as u32).max(1);
        let new_height = ((height as f32 * scale).round() as u32).max(1);
        (new_width, new_height)
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_image_keeps_size() {
        let pre = ImagePreprocessor::new().with_max_size(100);
        let gray = pre.prepare(&DynamicImage::new_rgb8(40, 20));
        assert_eq!(gray.dimensions(), (40, 20));
    }

    #[test]
    fn test_large_image_is_downscaled() {
        let pre = ImagePreprocessor::new().with_max_size(100);
        let gray = pre.prepare(&DynamicImage::new_rgb8(400, 200));
        assert_eq!(gray.dimensions(), (100, 50));
    }
}
