//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three primitives the rendition
//! pipeline delegates: decode, resize and encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording [`MockBackend`](tests::MockBackend).

use super::params::{OutputFormat, Quality};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of an image or a resize target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    pub fn pixels(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Trait for image processing backends.
///
/// Implementations must be `Sync`: renditions of one upload are rendered in
/// parallel against a shared backend reference.
pub trait ImageBackend: Sync {
    /// Decode an in-memory payload, sniffing its format from the bytes.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Resample to exactly `target`. Aspect-ratio policy is decided by the caller.
    fn resize(&self, image: &DynamicImage, target: Dimensions) -> DynamicImage;

    /// Serialize an image in the given format.
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}
