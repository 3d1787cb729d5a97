//! Upload processing: one image in, a response document out.
//!
//! This is the orchestration layer. For each upload it:
//!
//! 1. rejects empty payloads before anything else,
//! 2. decodes the bytes,
//! 3. negotiates the response-wide output format ([`crate::format`]),
//! 4. resolves the requested renditions ([`crate::sizes`]),
//! 5. plans every rendition and enforces the pixel budget,
//! 6. encodes the original at full size,
//! 7. renders and encodes every rendition,
//! 8. assembles the [`ResponseDocument`].
//!
//! Any failure aborts the whole upload; there are no partial responses.
//!
//! ## Output naming
//!
//! ```text
//! upload: holiday.jpg (image/jpeg), sizes=thumbnail,640
//!
//! filename: holiday.jpg
//! resized:
//!   thumbnail.jpg   100 wide, height from aspect ratio
//!   640.jpg         640 wide, height from aspect ratio
//! ```
//!
//! ## Parallel Processing
//!
//! Renditions are rendered and encoded in parallel using
//! [rayon](https://docs.rs/rayon). Results are merged in request order, so a
//! repeated key keeps the last rendition and a failure reports the first
//! failing rendition, exactly as a sequential loop would.

use crate::config::ImagesConfig;
use crate::format::{self, FormatChoice};
use crate::imaging::{
    BackendError, Dimensions, ImageBackend, Quality, RustBackend, encode_data_uri, plan_rendition,
    render,
};
use crate::naming;
use crate::sizes::{self, RenditionSpec, SizeDirectives, SizeError};
use crate::types::ResponseDocument;
use image::DynamicImage;
use rayon::prelude::*;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("empty file uploaded")]
    EmptyInput,
    #[error("failed decoding image: {0}")]
    Decode(String),
    #[error("{0}")]
    Validation(String),
    #[error("failed encoding {target}: {source}")]
    Encoding {
        target: String,
        source: BackendError,
    },
}

impl ProcessError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessError::EmptyInput => "empty_input",
            ProcessError::Decode(_) => "decode",
            ProcessError::Validation(_) => "validation",
            ProcessError::Encoding { .. } => "encoding",
        }
    }

    /// Whether the upload itself is at fault (as opposed to the service).
    pub fn is_client_fault(&self) -> bool {
        !matches!(self, ProcessError::Encoding { .. })
    }
}

impl From<SizeError> for ProcessError {
    fn from(err: SizeError) -> Self {
        ProcessError::Validation(err.to_string())
    }
}

/// An uploaded file as received at the boundary.
#[derive(Debug, Clone, Copy)]
pub struct Upload<'a> {
    pub bytes: &'a [u8],
    /// Declared content type; may be empty.
    pub content_type: &'a str,
    /// Client-side filename; may be empty.
    pub filename: &'a str,
}

/// Tunables for processing, derived from [`ImagesConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Quality for JPEG output.
    pub quality: Quality,
    /// Largest rendition, in pixels, a request may ask for.
    pub max_pixels: u64,
}

impl ProcessOptions {
    pub fn from_images_config(config: &ImagesConfig) -> Self {
        Self {
            quality: Quality::new(config.jpeg_quality),
            max_pixels: config.max_pixels,
        }
    }
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self::from_images_config(&ImagesConfig::default())
    }
}

pub fn process_upload(
    upload: Upload<'_>,
    directives: &SizeDirectives,
    options: &ProcessOptions,
) -> Result<ResponseDocument, ProcessError> {
    process_upload_with_backend(&RustBackend::new(), upload, directives, options)
}

/// Process an upload using a specific backend (allows testing with mock).
pub fn process_upload_with_backend(
    backend: &impl ImageBackend,
    upload: Upload<'_>,
    directives: &SizeDirectives,
    options: &ProcessOptions,
) -> Result<ResponseDocument, ProcessError> {
    if upload.bytes.is_empty() {
        return Err(ProcessError::EmptyInput);
    }

    let image = backend
        .decode(upload.bytes)
        .map_err(|e| ProcessError::Decode(e.to_string()))?;
    let source = Dimensions::of(&image);

    let choice = format::negotiate(
        directives.format.as_deref(),
        upload.content_type,
        upload.filename,
    );
    let specs = sizes::resolve(directives)?;
    check_pixel_budget(source, &specs, options.max_pixels)?;

    debug!(
        width = source.width,
        height = source.height,
        mime = choice.mime(),
        renditions = specs.len(),
        "Decoded upload"
    );

    let original = encode_data_uri(backend, &image, choice.mime(), options.quality).map_err(
        |source| ProcessError::Encoding {
            target: "original".to_string(),
            source,
        },
    )?;

    let rendered: Vec<Result<(String, String), ProcessError>> = specs
        .par_iter()
        .map(|spec| render_rendition(backend, &image, spec, &choice, options.quality))
        .collect();

    let mut resized = BTreeMap::new();
    for result in rendered {
        let (key, data_uri) = result?;
        resized.insert(key, data_uri);
    }

    Ok(ResponseDocument {
        original: original.data_uri,
        resized,
        filename: naming::output_filename(upload.filename, &choice.extension),
        filesize: upload.bytes.len() as u64,
        mime_type: choice.mime().to_string(),
    })
}

/// Reject the request if any planned rendition exceeds `max_pixels`.
fn check_pixel_budget(
    source: Dimensions,
    specs: &[RenditionSpec],
    max_pixels: u64,
) -> Result<(), ProcessError> {
    for spec in specs {
        let Some(target) = plan_rendition(source, spec.width, spec.height) else {
            continue;
        };
        if target.pixels() > max_pixels {
            return Err(ProcessError::Validation(format!(
                "rendition {} ({}x{}) exceeds the limit of {} pixels",
                spec.name, target.width, target.height, max_pixels
            )));
        }
    }
    Ok(())
}

fn render_rendition(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    spec: &RenditionSpec,
    choice: &FormatChoice,
    quality: Quality,
) -> Result<(String, String), ProcessError> {
    let key = format!("{}{}", spec.name, choice.extension);
    let rendition = render(backend, image, spec.width, spec.height);
    let encoded = encode_data_uri(backend, &rendition, choice.mime(), quality).map_err(|source| {
        ProcessError::Encoding {
            target: key.clone(),
            source,
        }
    })?;

    debug!(
        key = %key,
        width = rendition.width(),
        height = rendition.height(),
        bytes = encoded.byte_len,
        "Encoded rendition"
    );
    Ok((key, encoded.data_uri))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::OutputFormat;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::*;

    fn directives(sizes: Option<&str>, custom_sizes: Option<&str>, format: Option<&str>) -> SizeDirectives {
        SizeDirectives {
            sizes: sizes.map(str::to_string),
            custom_sizes: custom_sizes.map(str::to_string),
            custom: None,
            format: format.map(str::to_string),
        }
    }

    fn keys(doc: &ResponseDocument) -> Vec<&str> {
        doc.resized.keys().map(String::as_str).collect()
    }

    // =========================================================================
    // End-to-end with the real backend
    // =========================================================================

    #[test]
    fn jpeg_upload_with_presets_and_number() {
        let bytes = jpeg_bytes(2000, 1000);
        let doc = process_upload(
            upload(&bytes, "image/jpeg", "landscape.jpg"),
            &directives(Some(r#"["thumbnail","large","999"]"#), None, None),
            &ProcessOptions::default(),
        )
        .unwrap();

        let mut got = keys(&doc);
        got.sort();
        assert_eq!(got, vec!["999.jpg", "large.jpg", "thumbnail.jpg"]);
        assert_data_uri_dimensions(&doc.resized["thumbnail.jpg"], 100, 50);
        assert_data_uri_dimensions(&doc.resized["large.jpg"], 1000, 500);
        assert_data_uri_dimensions(&doc.resized["999.jpg"], 999, 500);
        assert_eq!(doc.mime_type, "image/jpeg");
        assert_eq!(doc.filename, "landscape.jpg");
        assert_eq!(doc.filesize, bytes.len() as u64);
        assert!(doc.original.starts_with("data:image/jpeg;base64,"));
        assert_data_uri_dimensions(&doc.original, 2000, 1000);
    }

    #[test]
    fn custom_size_with_png_override_is_exact() {
        let bytes = jpeg_bytes(400, 200);
        let doc = process_upload(
            upload(&bytes, "image/jpeg", "wide.jpg"),
            &directives(None, Some(r#"[{"width":300,"height":300}]"#), Some("png")),
            &ProcessOptions::default(),
        )
        .unwrap();

        assert_eq!(keys(&doc), vec!["300x300.png"]);
        let (mime, _) = split_data_uri(&doc.resized["300x300.png"]);
        assert_eq!(mime, "image/png");
        assert_data_uri_dimensions(&doc.resized["300x300.png"], 300, 300);
        assert_eq!(doc.filename, "wide.png");
        assert_eq!(doc.mime_type, "image/png");
    }

    #[test]
    fn defaults_when_nothing_requested() {
        let bytes = png_bytes(200, 100);
        let doc = process_upload(
            upload(&bytes, "image/png", "small.png"),
            &SizeDirectives::default(),
            &ProcessOptions::default(),
        )
        .unwrap();

        assert_eq!(keys(&doc), vec!["large.png", "medium.png", "thumbnail.png"]);
        assert_data_uri_dimensions(&doc.resized["medium.png"], 500, 250);
    }

    #[test]
    fn undeclared_type_outputs_png() {
        let bytes = jpeg_bytes(100, 100);
        let doc = process_upload(
            upload(&bytes, "application/octet-stream", "blob.jpg"),
            &directives(Some("50"), None, None),
            &ProcessOptions::default(),
        )
        .unwrap();

        assert_eq!(doc.mime_type, "image/png");
        assert_eq!(doc.filename, "blob.png");
        assert_eq!(keys(&doc), vec!["50.png"]);
    }

    #[test]
    fn missing_content_type_keeps_filename_extension() {
        let bytes = jpeg_bytes(200, 100);
        let doc = process_upload(
            upload(&bytes, "", "photo.jpg"),
            &directives(Some("thumbnail"), None, None),
            &ProcessOptions::default(),
        )
        .unwrap();

        assert_eq!(doc.mime_type, "image/png");
        assert_eq!(doc.filename, "photo.jpg");
        assert_eq!(keys(&doc), vec!["thumbnail.jpg"]);
        let (mime, _) = split_data_uri(&doc.resized["thumbnail.jpg"]);
        assert_eq!(mime, "image/png");
    }

    #[test]
    fn malformed_custom_sizes_is_validation_error() {
        let bytes = jpeg_bytes(64, 64);
        let err = process_upload(
            upload(&bytes, "image/jpeg", "a.jpg"),
            &directives(None, Some("not-json"), None),
            &ProcessOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, ProcessError::Validation(_)));
        assert!(err.is_client_fault());
        assert!(err.to_string().contains("customSizes"));
    }

    #[test]
    fn garbage_bytes_are_decode_error() {
        let err = process_upload(
            upload(b"not an image", "image/png", "x.png"),
            &SizeDirectives::default(),
            &ProcessOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "decode");
        assert!(err.is_client_fault());
    }

    // =========================================================================
    // Orchestration with the mock backend
    // =========================================================================

    #[test]
    fn empty_upload_fails_before_decode() {
        let backend = MockBackend::decoding_to(10, 10);
        let err = process_upload_with_backend(
            &backend,
            upload(&[], "image/png", "x.png"),
            &SizeDirectives::default(),
            &ProcessOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, ProcessError::EmptyInput));
        assert_eq!(err.kind(), "empty_input");
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn validation_error_encodes_nothing() {
        let backend = MockBackend::decoding_to(10, 10);
        let result = process_upload_with_backend(
            &backend,
            upload(b"img", "image/png", "x.png"),
            &directives(Some("thumbnail"), Some("[oops"), None),
            &ProcessOptions::default(),
        );

        assert!(result.is_err());
        assert_eq!(backend.get_operations(), vec![RecordedOp::Decode(3)]);
    }

    #[test]
    fn encoding_failure_aborts_whole_upload() {
        // medium → 500x250 fails; thumbnail and large would succeed
        let backend = MockBackend::decoding_to(2000, 1000).failing_encode_at(500, 250);
        let err = process_upload_with_backend(
            &backend,
            upload(b"img", "image/jpeg", "x.jpg"),
            &SizeDirectives::default(),
            &ProcessOptions::default(),
        )
        .unwrap_err();

        match &err {
            ProcessError::Encoding { target, .. } => assert_eq!(target, "medium.jpg"),
            other => panic!("expected encoding error, got {other:?}"),
        }
        assert!(!err.is_client_fault());
        assert_eq!(err.kind(), "encoding");
    }

    #[test]
    fn original_encoding_failure_is_reported_as_original() {
        let backend = MockBackend::decoding_to(30, 20).failing_encode_at(30, 20);
        let err = process_upload_with_backend(
            &backend,
            upload(b"img", "image/png", "x.png"),
            &SizeDirectives::default(),
            &ProcessOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, ProcessError::Encoding { ref target, .. } if target == "original"));
    }

    #[test]
    fn first_failure_in_request_order_is_reported() {
        // Both 20 and 30 fail; rayon may finish either first
        let backend = MockBackend::decoding_to(100, 100)
            .failing_encode_at(20, 20)
            .failing_encode_at(30, 30);
        let err = process_upload_with_backend(
            &backend,
            upload(b"img", "image/png", "x.png"),
            &directives(Some("10,20,30"), None, None),
            &ProcessOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, ProcessError::Encoding { ref target, .. } if target == "20.png"));
    }

    #[test]
    fn duplicate_renditions_collapse_to_one_key() {
        let backend = MockBackend::decoding_to(400, 400);
        let doc = process_upload_with_backend(
            &backend,
            upload(b"img", "image/png", "x.png"),
            &directives(Some("thumbnail,thumbnail"), None, None),
            &ProcessOptions::default(),
        )
        .unwrap();

        assert_eq!(keys(&doc), vec!["thumbnail.png"]);
        let encodes = backend
            .get_operations()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::Encode { .. }))
            .count();
        // original + both thumbnails
        assert_eq!(encodes, 3);
    }

    #[test]
    fn quality_and_format_reach_the_backend() {
        let backend = MockBackend::decoding_to(100, 50);
        let options = ProcessOptions {
            quality: Quality::new(42),
            ..ProcessOptions::default()
        };
        process_upload_with_backend(
            &backend,
            upload(b"img", "image/png", "x.png"),
            &directives(Some("10"), None, Some("jpg")),
            &options,
        )
        .unwrap();

        let ops = backend.get_operations();
        assert!(ops.iter().all(|op| match op {
            RecordedOp::Encode {
                format, quality, ..
            } => *format == OutputFormat::Jpeg && *quality == 42,
            _ => true,
        }));
    }

    #[test]
    fn oversized_rendition_is_rejected_before_encoding() {
        let backend = MockBackend::decoding_to(100, 100);
        let options = ProcessOptions {
            max_pixels: 10_000,
            ..ProcessOptions::default()
        };
        let err = process_upload_with_backend(
            &backend,
            upload(b"img", "image/png", "x.png"),
            &directives(Some("100,101"), None, None),
            &options,
        )
        .unwrap_err();

        assert!(matches!(err, ProcessError::Validation(ref msg) if msg.contains("101")));
        assert_eq!(backend.get_operations(), vec![RecordedOp::Decode(3)]);
    }

    #[test]
    fn filesize_is_upload_size() {
        let backend = MockBackend::decoding_to(8, 8);
        let payload = vec![7u8; 4096];
        let doc = process_upload_with_backend(
            &backend,
            upload(&payload, "image/png", "big.png"),
            &SizeDirectives::default(),
            &ProcessOptions::default(),
        )
        .unwrap();
        assert_eq!(doc.filesize, 4096);
    }
}
