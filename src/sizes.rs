//! Rendition size resolution.
//!
//! Turns the raw size directives of an upload into the ordered list of
//! renditions to produce. Three sources are read, in this order:
//!
//! 1. **Size tokens** (`sizes`): preset names or positive integers, as a JSON
//!    array of strings or, failing that, a comma-separated string.
//!    `["thumbnail","999"]` and `thumbnail,999` are equivalent.
//! 2. **Custom sizes** (`customSizes`): a JSON array of `{"width","height"}`
//!    objects. Malformed JSON here rejects the whole request.
//! 3. **Legacy custom size** (`custom`): a single `{"width","height"}` object,
//!    kept for older clients. Malformed JSON here is ignored.
//!
//! ## Presets
//!
//! | Name | Width |
//! |---|---|
//! | `thumbnail` | 100 |
//! | `medium` | 500 |
//! | `large` | 1000 |
//!
//! Preset renditions constrain width only; height follows the aspect ratio.
//!
//! ## Leniency
//!
//! Tokens that are neither a preset nor a positive integer, and custom pairs
//! without two positive sides, are dropped without error. If nothing survives,
//! the three presets are produced. Duplicates are kept: the response map lets
//! the later one win.

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SizeError {
    #[error("failed to parse customSizes: {0}")]
    CustomSizes(#[from] serde_json::Error),
}

/// Preset name → target width. Names are case-sensitive.
pub const PRESETS: &[(&str, u32)] = &[("thumbnail", 100), ("medium", 500), ("large", 1000)];

/// One rendition to produce.
///
/// A zero width or height leaves that axis unconstrained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionSpec {
    /// Key stem in the response map; the output extension is appended.
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl RenditionSpec {
    fn preset(name: &str, width: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height: 0,
        }
    }
}

/// Raw, unparsed size and format directives as received from the client.
///
/// Empty strings are treated the same as absent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeDirectives {
    pub sizes: Option<String>,
    pub custom_sizes: Option<String>,
    pub custom: Option<String>,
    pub format: Option<String>,
}

/// A `{"width": .., "height": ..}` pair. Missing sides read as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CustomSize {
    pub width: i64,
    pub height: i64,
}

impl CustomSize {
    /// Exact-fit rendition named `<w>x<h>`, if both sides are positive.
    pub fn to_spec(self) -> Option<RenditionSpec> {
        let width = u32::try_from(self.width).ok().filter(|&w| w > 0)?;
        let height = u32::try_from(self.height).ok().filter(|&h| h > 0)?;
        Some(RenditionSpec {
            name: format!("{width}x{height}"),
            width,
            height,
        })
    }
}

/// Width of the named preset.
pub fn preset_width(name: &str) -> Option<u32> {
    PRESETS
        .iter()
        .find(|(preset, _)| *preset == name)
        .map(|&(_, width)| width)
}

/// The renditions produced when a request asks for nothing usable.
pub fn default_renditions() -> Vec<RenditionSpec> {
    PRESETS
        .iter()
        .map(|&(name, width)| RenditionSpec::preset(name, width))
        .collect()
}

fn non_empty(source: Option<&str>) -> Option<&str> {
    source.filter(|s| !s.is_empty())
}

/// Split the size-token source into raw tokens.
///
/// Tries a JSON array of strings first; anything else is split on commas
/// verbatim (no trimming).
pub fn parse_size_tokens(raw: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(raw)
        .unwrap_or_else(|_| raw.split(',').map(str::to_string).collect())
}

/// Resolve one token into a rendition, or `None` if it should be dropped.
///
/// - preset name → `{name, presetWidth, 0}`
/// - positive integer `n` → `{"n", n, 0}` (name is normalised, so `+07` → `7`)
pub fn resolve_token(token: &str) -> Option<RenditionSpec> {
    if let Some(width) = preset_width(token) {
        return Some(RenditionSpec::preset(token, width));
    }
    let width = token.parse::<u32>().ok().filter(|&n| n > 0)?;
    Some(RenditionSpec::preset(&width.to_string(), width))
}

/// Parse the custom-size list. Malformed JSON is an error.
pub fn parse_custom_sizes(raw: &str) -> Result<Vec<CustomSize>, SizeError> {
    Ok(serde_json::from_str(raw)?)
}

/// Parse the legacy single custom size. Malformed JSON is ignored.
pub fn parse_legacy_custom(raw: &str) -> Option<CustomSize> {
    serde_json::from_str(raw).ok()
}

/// Resolve all size directives into an ordered rendition list.
///
/// Order: size tokens, then custom sizes, then the legacy custom size. Falls
/// back to [`default_renditions`] when nothing valid was requested.
pub fn resolve(directives: &SizeDirectives) -> Result<Vec<RenditionSpec>, SizeError> {
    let mut specs: Vec<RenditionSpec> = non_empty(directives.sizes.as_deref())
        .map(parse_size_tokens)
        .unwrap_or_default()
        .iter()
        .filter_map(|token| resolve_token(token))
        .collect();

    if let Some(raw) = non_empty(directives.custom_sizes.as_deref()) {
        specs.extend(
            parse_custom_sizes(raw)?
                .into_iter()
                .filter_map(CustomSize::to_spec),
        );
    }

    if let Some(spec) = non_empty(directives.custom.as_deref())
        .and_then(parse_legacy_custom)
        .and_then(CustomSize::to_spec)
    {
        specs.push(spec);
    }

    if specs.is_empty() {
        specs = default_renditions();
    }
    Ok(specs)
}
