//! Pure calculation functions for rendition dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale `edge` by `numerator / denominator`, rounding half up, never below 1.
fn scale_edge(edge: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = (edge as f64 * numerator as f64 / denominator as f64).round();
    scaled.clamp(1.0, u32::MAX as f64) as u32
}

/// Calculate the output dimensions for a rendition request.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Requested (width, height); 0 leaves that axis unconstrained
///
/// # Returns
/// * `None` when both axes are unconstrained (the image is used as-is)
/// * `Some((width, height))` otherwise:
///   - both set: exactly the request, aspect ratio not preserved
///   - width only: height derived from the source aspect ratio
///   - height only: width derived from the source aspect ratio
///
/// # Examples
/// ```
/// # use image_resizer::imaging::rendition_dimensions;
/// // 2000x1000 landscape at width 100 → 100x50
/// assert_eq!(rendition_dimensions((2000, 1000), (100, 0)), Some((100, 50)));
///
/// // Exact fit ignores the source aspect ratio
/// assert_eq!(rendition_dimensions((2000, 1000), (300, 300)), Some((300, 300)));
/// ```
pub fn rendition_dimensions(source: (u32, u32), target: (u32, u32)) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    match target {
        (0, 0) => None,
        (w, 0) => Some((w, scale_edge(w, src_h, src_w.max(1)))),
        (0, h) => Some((scale_edge(h, src_w, src_h.max(1)), h)),
        (w, h) => Some((w, h)),
    }
}
