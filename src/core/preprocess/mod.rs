//! # Preprocess Module
//!
//! Turns an [`ImageReference`] into a [`DecodedImage`] ready for labeling.
//!
//! ## How It Works
//! 1. Read the referenced bytes (memory-mapped for large files)
//! 2. Validate the header and decode (zune-jpeg for JPEG, image crate otherwise)
//! 3. Compute an aspect-preserving size within the bounds
//! 4. Scale with a bilinear filter (fast_image_resize)
//!
//! The source is never cropped and never mutated.

mod decode;
mod reference;
mod scale;

pub use decode::FastDecoder;
pub use reference::{validate_image_header, ImageBytes, ImageReference};
pub use scale::{target_dimensions, FastResizer};

use crate::error::DecodeError;
use image::{DynamicImage, RgbaImage};
use tracing::debug;

/// Default preview bound (width)
pub const DEFAULT_MAX_WIDTH: u32 = 800;
/// Default preview bound (height)
pub const DEFAULT_MAX_HEIGHT: u32 = 600;

/// A decoded, resized pixel buffer.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbaImage,
    original_width: u32,
    original_height: u32,
}

impl DecodedImage {
    /// Wrap pixels that were not resized
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        let (original_width, original_height) = pixels.dimensions();
        Self {
            pixels,
            original_width,
            original_height,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Size of the source before resizing
    pub fn original_dimensions(&self) -> (u32, u32) {
        (self.original_width, self.original_height)
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_dynamic(self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.pixels)
    }
}

/// Bounds for preprocessing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessConfig {
    pub max_width: u32,
    pub max_height: u32,
}

impl PreprocessConfig {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    /// Preprocess `source` within these bounds
    pub fn apply(&self, source: &ImageReference) -> Result<DecodedImage, DecodeError> {
        resize(source, self.max_width, self.max_height)
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WIDTH, DEFAULT_MAX_HEIGHT)
    }
}

/// Decode `source` and scale it to fit `max_width` x `max_height`,
/// preserving its aspect ratio.
pub fn resize(
    source: &ImageReference,
    max_width: u32,
    max_height: u32,
) -> Result<DecodedImage, DecodeError> {
    // Reject bad bounds before paying for a decode.
    if max_width == 0 || max_height == 0 {
        return Err(DecodeError::InvalidTarget {
            width: max_width,
            height: max_height,
        });
    }

    let image = FastDecoder::decode(source)?;
    let original = (image.width(), image.height());
    let (width, height) = target_dimensions(original, max_width, max_height)?;

    let pixels = FastResizer::new().resize_rgba(&image, width, height)?;

    debug!(
        reference = %source,
        original_width = original.0,
        original_height = original.1,
        width,
        height,
        "Preprocessed image"
    );

    Ok(DecodedImage {
        pixels,
        original_width: original.0,
        original_height: original.1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_reference(width: u32, height: u32) -> ImageReference {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 120, 200])));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        ImageReference::from_bytes(format!("{}x{}.png", width, height), bytes)
    }

    #[test]
    fn landscape_source_is_bounded_by_width() {
        let decoded = resize(&png_reference(1600, 800), 800, 600).unwrap();
        assert_eq!(decoded.dimensions(), (800, 400));
        assert_eq!(decoded.original_dimensions(), (1600, 800));
    }

    #[test]
    fn portrait_source_is_bounded_by_height() {
        let decoded = resize(&png_reference(300, 600), 800, 600).unwrap();
        assert_eq!(decoded.dimensions(), (300, 600));
    }

    #[test]
    fn oversized_bounds_fail_instead_of_allocating() {
        let error = resize(&png_reference(2, 1), u32::MAX, u32::MAX).unwrap_err();
        assert!(matches!(error, DecodeError::InvalidTarget { .. }));
    }

    #[test]
    fn default_config_uses_preview_bounds() {
        let config = PreprocessConfig::default();
        assert_eq!((config.max_width, config.max_height), (800, 600));

        let decoded = config.apply(&png_reference(400, 400)).unwrap();
        assert_eq!(decoded.dimensions(), (600, 600));
    }

    #[test]
    fn undecodable_reference_is_a_decode_error() {
        let reference = ImageReference::from_bytes("junk", b"definitely not pixels".to_vec());
        assert!(matches!(
            resize(&reference, 800, 600),
            Err(DecodeError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let reference = ImageReference::from_path("/nonexistent/photo.jpg");
        assert!(matches!(
            resize(&reference, 800, 600),
            Err(DecodeError::NotFound { .. })
        ));
    }

    #[test]
    fn zero_bounds_are_rejected_before_decoding() {
        let reference = ImageReference::from_path("/nonexistent/photo.jpg");
        assert!(matches!(
            resize(&reference, 800, 0),
            Err(DecodeError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn resize_leaves_source_untouched() {
        let reference = png_reference(64, 32);
        let before = reference.read_bytes().unwrap().to_vec();
        resize(&reference, 16, 16).unwrap();
        assert_eq!(reference.read_bytes().unwrap().to_vec(), before);
    }
}
