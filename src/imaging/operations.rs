//! High-level image operations.
//!
//! These functions combine calculations with backend execution: they decide
//! what a rendition should look like and hand the pixel work to an
//! [`ImageBackend`].

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::rendition_dimensions;
use super::params::{OutputFormat, Quality};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use std::borrow::Cow;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Plan the output dimensions of a rendition without touching pixels.
///
/// Returns `None` when neither axis is constrained and the source is used as-is.
pub fn plan_rendition(source: Dimensions, width: u32, height: u32) -> Option<Dimensions> {
    rendition_dimensions((source.width, source.height), (width, height))
        .map(|(width, height)| Dimensions { width, height })
}

/// Render one rendition of `image`.
///
/// With both axes unconstrained the input is returned borrowed and unchanged;
/// otherwise the backend allocates a new image at the planned dimensions.
pub fn render<'a>(
    backend: &impl ImageBackend,
    image: &'a DynamicImage,
    width: u32,
    height: u32,
) -> Cow<'a, DynamicImage> {
    match plan_rendition(Dimensions::of(image), width, height) {
        Some(target) => Cow::Owned(backend.resize(image, target)),
        None => Cow::Borrowed(image),
    }
}

/// An encoded image ready to embed in a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// `data:<mime>;base64,<payload>`
    pub data_uri: String,
    /// The mime actually used. Differs from the request when it fell back to PNG.
    pub mime: &'static str,
    /// Size of the encoded payload before base64.
    pub byte_len: usize,
}

/// Build a `data:` URI from a mime type and raw bytes.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Encode `image` as a data URI in the requested mime type.
///
/// `image/jpeg` (alias `image/jpg`) and `image/png` are honored; anything else
/// is encoded as PNG and reported as `image/png`. Callers must label output
/// with [`EncodedImage::mime`], not with what they asked for.
pub fn encode_data_uri(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    requested_mime: &str,
    quality: Quality,
) -> Result<EncodedImage> {
    let format = OutputFormat::from_mime(requested_mime).unwrap_or(OutputFormat::Png);
    let bytes = backend.encode(image, format, quality)?;
    Ok(EncodedImage {
        data_uri: data_uri(format.mime(), &bytes),
        mime: format.mime(),
        byte_len: bytes.len(),
    })
}
