//! CLI output formatting for the `resize` command.
//!
//! # Output Format
//!
//! ```text
//! landscape.jpg (image/jpeg, uploaded 412.3 KB)
//!     original: 2000x1000, 388.1 KB
//!     999.jpg: 999x500, 61.0 KB
//!     large.jpg: 1000x500, 64.2 KB
//!     thumbnail.jpg: 100x50, 2.1 KB
//! ```
//!
//! Dimensions are read back from each embedded image header, so the summary
//! shows what was actually encoded rather than what was requested.
//!
//! # Architecture
//!
//! `format_*` functions return `Vec<String>` for testability and a `print_*`
//! wrapper writes to stdout. Format functions are pure: no I/O, no side
//! effects.

use crate::types::ResponseDocument;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageReader;
use std::io::Cursor;

// ============================================================================
// Helpers
// ============================================================================

/// Human-readable byte size: `512 B`, `2.1 KB`, `3.4 MB`.
fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let n = bytes as f64;
    if n >= MB {
        format!("{:.1} MB", n / MB)
    } else if n >= KB {
        format!("{:.1} KB", n / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Pixel dimensions and payload size of an embedded image.
fn describe_data_uri(uri: &str) -> String {
    let Some(payload) = uri.split_once(";base64,").map(|(_, p)| p) else {
        return "not a data URI".to_string();
    };
    let Ok(bytes) = STANDARD.decode(payload) else {
        return "invalid base64".to_string();
    };
    let dimensions = ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());

    match dimensions {
        Some((w, h)) => format!("{}x{}, {}", w, h, format_bytes(bytes.len())),
        None => format!("unreadable, {}", format_bytes(bytes.len())),
    }
}

// ============================================================================
// Resize summary
// ============================================================================

/// Format a processed upload: header line, then the original and every
/// rendition in key order.
pub fn format_resize_summary(doc: &ResponseDocument) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}, uploaded {})",
        doc.filename,
        doc.mime_type,
        format_bytes(doc.filesize as usize)
    )];
    lines.push(format!("    original: {}", describe_data_uri(&doc.original)));
    for (key, uri) in &doc.resized {
        lines.push(format!("    {}: {}", key, describe_data_uri(uri)));
    }
    lines
}

pub fn print_resize_summary(doc: &ResponseDocument) {
    for line in format_resize_summary(doc) {
        println!("{}", line);
    }
}
