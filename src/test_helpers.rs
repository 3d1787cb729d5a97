//! Shared test utilities for the image-resizer test suite.
//!
//! Builds small synthetic uploads and decodes data URIs back into images so
//! tests can assert on real pixel dimensions.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let bytes = jpeg_bytes(2000, 1000);
//! let doc = process_upload(upload(&bytes, "image/jpeg", "photo.jpg"), ...).unwrap();
//! assert_data_uri_dimensions(&doc.resized["thumbnail.jpg"], 100, 50);
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageEncoder, ImageFormat, RgbImage};
use std::io::Cursor;

use crate::process::Upload;

// =========================================================================
// Synthetic uploads
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Encode a gradient of the given size as JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Encode a gradient of the given size as PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub fn upload<'a>(bytes: &'a [u8], content_type: &'a str, filename: &'a str) -> Upload<'a> {
    Upload {
        bytes,
        content_type,
        filename,
    }
}

// =========================================================================
// Data URI inspection
// =========================================================================

/// Split a data URI into its mime type and decoded payload.
pub fn split_data_uri(uri: &str) -> (String, Vec<u8>) {
    let rest = uri.strip_prefix("data:").expect("data URI prefix");
    let (mime, payload) = rest.split_once(";base64,").expect("base64 marker");
    (mime.to_string(), STANDARD.decode(payload).expect("valid base64"))
}

/// Decode the image embedded in a data URI.
pub fn decode_data_uri(uri: &str) -> DynamicImage {
    let (_, bytes) = split_data_uri(uri);
    image::load_from_memory(&bytes).expect("embedded image decodes")
}

pub fn assert_data_uri_dimensions(uri: &str, width: u32, height: u32) {
    let img = decode_data_uri(uri);
    assert_eq!(
        (img.width(), img.height()),
        (width, height),
        "unexpected dimensions for {}...",
        &uri[..uri.len().min(32)]
    );
}
