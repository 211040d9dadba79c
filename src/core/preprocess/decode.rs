//! Fast image decoding with format-specific optimizations.
//!
//! Uses zune-jpeg for JPEG data (1.5-2x faster than image crate),
//! falls back to image crate for other formats.

use super::reference::{validate_image_header, ImageReference};
use crate::error::DecodeError;
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb, Rgba};
use tracing::debug;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Fast image decoder that uses optimized decoders per format
pub struct FastDecoder;

impl FastDecoder {
    /// Load and decode the referenced image.
    pub fn decode(reference: &ImageReference) -> Result<DynamicImage, DecodeError> {
        let bytes = reference.read_bytes()?;
        Self::decode_bytes(&bytes, &reference.to_string())
    }

    /// Decode raw bytes. `reference` is only used in error messages.
    pub fn decode_bytes(bytes: &[u8], reference: &str) -> Result<DynamicImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty {
                reference: reference.to_string(),
            });
        }

        if !validate_image_header(bytes) {
            return Err(DecodeError::UnsupportedFormat {
                reference: reference.to_string(),
            });
        }

        let format = image::guess_format(bytes).map_err(|_| DecodeError::UnsupportedFormat {
            reference: reference.to_string(),
        })?;

        let image = match format {
            ImageFormat::Jpeg => Self::decode_jpeg(bytes, reference).or_else(|e| {
                debug!(%reference, error = %e, "zune-jpeg failed, falling back to image crate");
                Self::decode_fallback(bytes, reference)
            })?,
            _ => Self::decode_fallback(bytes, reference)?,
        };

        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError::Empty {
                reference: reference.to_string(),
            });
        }

        Ok(image)
    }

    /// Fast JPEG decoding using zune-jpeg
    fn decode_jpeg(bytes: &[u8], reference: &str) -> Result<DynamicImage, DecodeError> {
        let corrupt = |reason: String| DecodeError::Corrupt {
            reference: reference.to_string(),
            reason,
        };

        let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
        let mut decoder = JpegDecoder::new_with_options(bytes, options);

        let pixels = decoder
            .decode()
            .map_err(|e| corrupt(format!("zune-jpeg decode failed: {:?}", e)))?;

        let info = decoder
            .info()
            .ok_or_else(|| corrupt("Failed to get image info".to_string()))?;

        let width = info.width as u32;
        let height = info.height as u32;

        let image = match decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB) {
            ColorSpace::RGB => {
                let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels)
                        .ok_or_else(|| corrupt("Failed to create RGB buffer".to_string()))?;
                DynamicImage::ImageRgb8(buffer)
            }
            ColorSpace::RGBA => {
                let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels)
                        .ok_or_else(|| corrupt("Failed to create RGBA buffer".to_string()))?;
                DynamicImage::ImageRgba8(buffer)
            }
            ColorSpace::Luma => {
                let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels)
                        .ok_or_else(|| corrupt("Failed to create Luma buffer".to_string()))?;
                DynamicImage::ImageLuma8(buffer)
            }
            other => return Err(corrupt(format!("Unsupported colorspace {:?}", other))),
        };

        Ok(image)
    }

    fn decode_fallback(bytes: &[u8], reference: &str) -> Result<DynamicImage, DecodeError> {
        image::load_from_memory(bytes).map_err(|e| DecodeError::Corrupt {
            reference: reference.to_string(),
            reason: e.to_string(),
        })
    }
}
