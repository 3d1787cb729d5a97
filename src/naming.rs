//! Filename handling for uploaded images.
//!
//! Uploads keep their original base name; only the extension changes to match
//! the chosen output format:
//! - `holiday.jpeg` as PNG → `holiday.png`
//! - `scan.tar.png` as JPEG → `scan.tar.jpg`
//! - `README` as PNG → `README.png`
//!
//! ## Extension rules
//!
//! The extension is everything from the last `.` after the last `/`,
//! dot included. Backslashes are ordinary characters. A leading dot counts, so `.hidden` is all extension and has
//! an empty stem. Case is preserved: `IMG_01.JPG` has extension `.JPG`.

/// Result of splitting an uploaded filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitName<'a> {
    /// Everything before the extension, directories included.
    pub stem: &'a str,
    /// The extension with its leading dot, or empty.
    pub extension: &'a str,
}

/// Split a filename into stem and extension.
///
/// - `"photo.jpg"` → stem=`"photo"`, extension=`".jpg"`
/// - `"archive.tar.gz"` → stem=`"archive.tar"`, extension=`".gz"`
/// - `"dir.v2/file"` → stem=`"dir.v2/file"`, extension=`""`
/// - `"trailing."` → stem=`"trailing"`, extension=`"."`
pub fn split_extension(filename: &str) -> SplitName<'_> {
    let name_start = filename.rfind('/').map(|i| i + 1).unwrap_or(0);
    match filename[name_start..].rfind('.') {
        Some(dot) => {
            let dot = name_start + dot;
            SplitName {
                stem: &filename[..dot],
                extension: &filename[dot..],
            }
        }
        None => SplitName {
            stem: filename,
            extension: "",
        },
    }
}

/// Extension of `filename`, or empty if it has none.
pub fn extension_of(filename: &str) -> &str {
    split_extension(filename).extension
}

/// Replace the extension of `filename` with `extension` (which carries its dot).
pub fn output_filename(filename: &str, extension: &str) -> String {
    format!("{}{}", split_extension(filename).stem, extension)
}
