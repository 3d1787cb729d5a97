//! # Image Resizer
//!
//! An HTTP service that takes one uploaded image and returns it together with
//! a set of resized renditions, every image embedded as a base64 `data:` URI
//! in a single JSON document.
//!
//! # Architecture: One Request, One Pipeline
//!
//! ```text
//! multipart form  →  SizeDirectives + Upload   (server)
//!                 →  format choice              (format)
//!                 →  rendition list             (sizes)
//!                 →  resize + encode            (imaging, in parallel)
//!                 →  ResponseDocument           (process → types)
//! ```
//!
//! Everything below the HTTP layer is synchronous and free of I/O, so the
//! same pipeline backs both `POST /upload` and the `resize` CLI command.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`server`] | axum router, multipart parsing, middleware, JSON errors, graceful shutdown |
//! | [`process`] | Orchestrates one upload into a [`types::ResponseDocument`] |
//! | [`sizes`] | Turns `sizes` / `customSizes` / `custom` form values into rendition specs |
//! | [`format`] | Chooses the response-wide output format and extension |
//! | [`imaging`] | Decode, resize and encode on top of the `image` crate |
//! | [`naming`] | Filename extension handling |
//! | [`config`] | `config.toml` loading, env overrides and validation |
//! | [`types`] | The JSON response document |
//! | [`output`] | CLI summary formatting |
//!
//! # Design Decisions
//!
//! ## Data URIs, Not Storage
//!
//! Nothing is written to disk. Every image goes back to the caller inline, so
//! the service holds no state between requests and any instance can serve any
//! request.
//!
//! ## Lenient Sizes, Strict JSON
//!
//! Size tokens the service does not understand are dropped silently; a
//! `customSizes` value that is not valid JSON fails the whole request. Loose
//! tokens come from hand-typed query strings, while `customSizes` is produced
//! by programs and a parse failure there is a real bug.
//!
//! ## One Format Per Response
//!
//! The original and every rendition share one mime type and one extension,
//! chosen once per request by [`format::negotiate`].
//!
//! ## Parallel Renditions
//!
//! Renditions are rendered on the rayon pool and merged back in request
//! order. Handlers hand the pipeline to `spawn_blocking` so the async
//! runtime never runs pixel work.

pub mod config;
pub mod format;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod process;
pub mod server;
pub mod sizes;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
