//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` (format sniffed from bytes) |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` on an RGB8 conversion |
//! | Encode → PNG | `image::DynamicImage::write_to` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{OutputFormat, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// JPEG has no alpha channel; the encoder rejects RGBA input, so flatten first.
fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {e}")))?;
    Ok(buf.into_inner())
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| BackendError::Encode(format!("PNG encode failed: {e}")))?;
    Ok(buf.into_inner())
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        image::load_from_memory(bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn resize(&self, image: &DynamicImage, target: Dimensions) -> DynamicImage {
        image.resize_exact(target.width, target.height, FilterType::Lanczos3)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        match format {
            OutputFormat::Jpeg => encode_jpeg(image, quality),
            OutputFormat::Png => encode_png(image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{jpeg_bytes, png_bytes};
    use image::{Rgba, RgbaImage};

    #[test]
    fn decode_synthetic_jpeg() {
        let backend = RustBackend::new();
        let img = backend.decode(&jpeg_bytes(200, 150)).unwrap();
        assert_eq!(Dimensions::of(&img), Dimensions { width: 200, height: 150 });
    }

    #[test]
    fn decode_synthetic_png() {
        let backend = RustBackend::new();
        let img = backend.decode(&png_bytes(64, 48)).unwrap();
        assert_eq!(img.width(), 64);
        assert_eq!(img.height(), 48);
    }

    #[test]
    fn decode_garbage_errors() {
        let backend = RustBackend::new();
        let result = backend.decode(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn decode_truncated_png_errors() {
        let backend = RustBackend::new();
        let bytes = png_bytes(32, 32);
        let result = backend.decode(&bytes[..bytes.len() / 2]);
        assert!(result.is_err());
    }

    #[test]
    fn resize_produces_exact_dimensions() {
        let backend = RustBackend::new();
        let img = DynamicImage::new_rgb8(400, 300);
        let resized = backend.resize(
            &img,
            Dimensions {
                width: 123,
                height: 45,
            },
        );
        assert_eq!(resized.width(), 123);
        assert_eq!(resized.height(), 45);
        // Source untouched
        assert_eq!(img.width(), 400);
    }

    #[test]
    fn png_roundtrip_preserves_dimensions() {
        let backend = RustBackend::new();
        let img = DynamicImage::new_rgb8(37, 91);
        let bytes = backend
            .encode(&img, OutputFormat::Png, Quality::default())
            .unwrap();
        let decoded = backend.decode(&bytes).unwrap();
        assert_eq!(Dimensions::of(&decoded), Dimensions::of(&img));
    }

    #[test]
    fn jpeg_encodes_rgba_input() {
        let backend = RustBackend::new();
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 8, Rgba([10, 20, 30, 128])));
        let bytes = backend
            .encode(&img, OutputFormat::Jpeg, Quality::new(80))
            .unwrap();
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = backend.decode(&bytes).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 8);
    }

    #[test]
    fn png_output_has_signature() {
        let backend = RustBackend::new();
        let bytes = backend
            .encode(&DynamicImage::new_rgb8(4, 4), OutputFormat::Png, Quality::default())
            .unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
