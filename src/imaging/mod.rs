//! Image processing on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Resize** | `resize_exact` + Lanczos3 |
//! | **Encode** | JPEG / PNG encoders, then base64 into a data URI |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Quality and output format descriptions
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: render and encode, combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::rendition_dimensions;
pub use operations::{EncodedImage, data_uri, encode_data_uri, plan_rendition, render};
pub use params::{OutputFormat, Quality};
pub use rust_backend::RustBackend;
