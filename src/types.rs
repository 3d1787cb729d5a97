//! Wire types returned to clients.
//!
//! Field names are part of the public contract and must not change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The JSON body of a successful upload.
///
/// `resized` is keyed by `<rendition name><extension>`. A `BTreeMap` keeps
/// serialization deterministic; clients must not rely on key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDocument {
    /// The uploaded image re-encoded in the chosen format, at full size.
    pub original: String,
    pub resized: BTreeMap<String, String>,
    /// Uploaded base name with the chosen extension.
    pub filename: String,
    /// Byte size of the upload, not of any rendition.
    pub filesize: u64,
    pub mime_type: String,
}
