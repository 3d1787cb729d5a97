//! Service configuration module.
//!
//! Handles loading, validating, and overriding `config.toml`. Stock defaults
//! are the base layer; a user `config.toml` is merged on top; a handful of
//! environment variables win over both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! port = 8080                           # Listen port (env: PORT)
//! cors_origin = "http://localhost:5173" # Allowed CORS origin, or "*" (env: CORS_ORIGIN)
//! max_upload_bytes = 12582912           # Request body limit (12 MiB)
//! request_timeout_secs = 60             # Whole-request deadline
//!
//! [images]
//! jpeg_quality = 95                     # JPEG quality (1-100)
//! max_pixels = 100000000                # Largest rendition a request may ask for
//!
//! [processing]
//! max_processes = 4                     # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [server]
//! port = 9000
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// HTTP listener and middleware settings.
    pub server: ServerConfig,
    /// Encoding settings and rendition limits.
    pub images: ImagesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

/// HTTP listener and middleware settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
    /// Single origin allowed by CORS, or `*` for any origin without credentials.
    pub cors_origin: String,
    /// Largest request body accepted, in bytes.
    pub max_upload_bytes: usize,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_origin: "http://localhost:5173".to_string(),
            max_upload_bytes: 12 << 20,
            request_timeout_secs: 60,
        }
    }
}

/// Encoding settings and rendition limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// JPEG quality (1-100).
    pub jpeg_quality: u32,
    /// Upper bound on `width * height` of any single rendition.
    pub max_pixels: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 95,
            max_pixels: 100_000_000,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel rendition workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port must be non-zero".into()));
        }
        if axum::http::HeaderValue::from_str(&self.server.cors_origin).is_err() {
            return Err(ConfigError::Validation(format!(
                "server.cors_origin is not a valid header value: {:?}",
                self.server.cors_origin
            )));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "server.max_upload_bytes must be non-zero".into(),
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "server.request_timeout_secs must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.images.jpeg_quality) {
            return Err(ConfigError::Validation(
                "images.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.images.max_pixels == 0 {
            return Err(ConfigError::Validation(
                "images.max_pixels must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Apply environment overrides (`PORT`, `CORS_ORIGIN`).
    ///
    /// `lookup` is `std::env::var` in production; tests pass a closure.
    /// Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").filter(|v| !v.is_empty()) {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Validation(format!("PORT is not a valid port: {port:?}")))?;
        }
        if let Some(origin) = lookup("CORS_ORIGIN").filter(|v| !v.is_empty()) {
            self.server.cors_origin = origin;
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// Base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ServiceConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `path`, merged over stock defaults, without env overrides.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let merged = match load_raw_config(path)? {
        Some(overlay) => merge_toml(stock_defaults_value()?, overlay),
        None => stock_defaults_value()?,
    };
    let config: ServiceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, then apply process environment overrides and re-validate.
pub fn load_config_with_env(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let mut config = load_config(path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# image-resizer configuration
# ===========================
# All options are optional. Values shown are the defaults.

[server]
# Port to listen on. The PORT environment variable overrides this.
port = 8080
# The one origin browsers may call from ("*" for any, without credentials).
# CORS_ORIGIN overrides this.
cors_origin = "http://localhost:5173"
# Largest accepted request body in bytes (12 MiB).
max_upload_bytes = 12582912
# Requests running longer than this are aborted.
request_timeout_secs = 60

[images]
# JPEG quality, 1-100. PNG output is lossless and ignores this.
jpeg_quality = 95
# Largest rendition (width x height) a single request may ask for.
max_pixels = 100000000

[processing]
# Maximum parallel rendition workers. Omit to use every CPU core.
# max_processes = 4
"##
}
