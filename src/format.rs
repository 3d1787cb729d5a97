//! Response-wide output format negotiation.
//!
//! One format is chosen per upload and applied to the original and every
//! rendition:
//!
//! 1. An explicit override (`jpg`, `jpeg`, `png`, or the matching mime,
//!    case-insensitive) wins, with the format's own extension.
//! 2. Otherwise a declared content type of exactly `image/jpeg` or
//!    `image/png` is kept, and the extension comes from the uploaded
//!    filename (`.png` when it has none). An empty content type reads as
//!    `image/png`.
//! 3. Otherwise PNG.

use crate::imaging::OutputFormat;
use crate::naming::extension_of;

/// The output format and file extension for one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatChoice {
    pub format: OutputFormat,
    /// Extension with its leading dot, appended to every output key.
    pub extension: String,
}

impl FormatChoice {
    fn canonical(format: OutputFormat) -> Self {
        Self {
            format,
            extension: format.extension().to_string(),
        }
    }

    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }
}

pub fn negotiate(format_override: Option<&str>, content_type: &str, filename: &str) -> FormatChoice {
    if let Some(format) = format_override.and_then(OutputFormat::from_override) {
        return FormatChoice::canonical(format);
    }

    let declared = match content_type {
        "image/jpeg" => Some(OutputFormat::Jpeg),
        "" | "image/png" => Some(OutputFormat::Png),
        _ => None,
    };
    match declared {
        Some(format) => {
            let ext = extension_of(filename);
            FormatChoice {
                format,
                extension: (if ext.is_empty() { ".png" } else { ext }).to_string(),
            }
        }
        None => FormatChoice::canonical(OutputFormat::Png),
    }
}
