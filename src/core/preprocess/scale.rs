//! Aspect-preserving target sizes and SIMD-accelerated resizing.
//!
//! Uses fast_image_resize, which picks AVX2/NEON kernels when available.

use crate::error::DecodeError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, RgbaImage};

/// Largest RGBA output buffer we agree to allocate (the `image` crate's
/// default allocation limit)
pub const MAX_TARGET_BYTES: u64 = 512 * 1024 * 1024;

/// Reject output sizes that are empty or whose RGBA buffer is too large.
fn check_target(width: u32, height: u32) -> Result<(), DecodeError> {
    let bytes = (width as u64)
        .checked_mul(height as u64)
        .and_then(|pixels| pixels.checked_mul(4));

    match bytes {
        Some(bytes) if width > 0 && height > 0 && bytes <= MAX_TARGET_BYTES => Ok(()),
        _ => Err(DecodeError::InvalidTarget { width, height }),
    }
}

/// Compute the output size for an `original` image bounded by `max_width`
/// x `max_height`.
///
/// Landscape sources take the full `max_width` and derive the height;
/// portrait and square sources take the full `max_height` and derive the
/// width. The derived side is rounded and never drops below 1. Targets whose
/// RGBA buffer would exceed [`MAX_TARGET_BYTES`] are rejected.
pub fn target_dimensions(
    original: (u32, u32),
    max_width: u32,
    max_height: u32,
) -> Result<(u32, u32), DecodeError> {
    if max_width == 0 || max_height == 0 {
        return Err(DecodeError::InvalidTarget {
            width: max_width,
            height: max_height,
        });
    }

    let (width, height) = original;
    if width == 0 || height == 0 {
        return Err(DecodeError::ResizeFailed(format!(
            "Invalid source dimensions {}x{}",
            width, height
        )));
    }

    let aspect_ratio = width as f64 / height as f64;

    let target = if width > height {
        let derived = (max_width as f64 / aspect_ratio).round() as u32;
        (max_width, derived.max(1))
    } else {
        let derived = (max_height as f64 * aspect_ratio).round() as u32;
        (derived.max(1), max_height)
    };

    check_target(target.0, target.1)?;
    Ok(target)
}

/// Reusable RGBA resizer
pub struct FastResizer {
    resizer: Resizer,
}

impl FastResizer {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    /// Scale `image` to exactly `width` x `height` with a bilinear filter.
    pub fn resize_rgba(
        &mut self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, DecodeError> {
        check_target(width, height)?;

        let rgba = image.to_rgba8();
        let (src_width, src_height) = rgba.dimensions();

        if src_width == 0 || src_height == 0 {
            return Err(DecodeError::ResizeFailed(
                "Invalid source dimensions".to_string(),
            ));
        }

        if (src_width, src_height) == (width, height) {
            return Ok(rgba);
        }

        let src_image = Image::from_vec_u8(src_width, src_height, rgba.into_raw(), PixelType::U8x4)
            .map_err(|e| DecodeError::ResizeFailed(format!("Failed to create source image: {}", e)))?;

        let mut dst_image = Image::new(width, height, PixelType::U8x4);

        let options =
            ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));

        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| DecodeError::ResizeFailed(e.to_string()))?;

        RgbaImage::from_raw(width, height, dst_image.into_vec()).ok_or_else(|| {
            DecodeError::ResizeFailed("Failed to create result buffer".to_string())
        })
    }
}

impl Default for FastResizer {
    fn default() -> Self {
        Self::new()
    }
}
