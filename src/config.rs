//! Processor configuration.
//!
//! Handles loading and validating `config.toml`. Every key is optional; the
//! stock defaults below apply to anything a file leaves out.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [encoding]
//! jpeg_quality = 75         # JPEG output quality (1-100)
//! png_compression = "best"  # fast | default | best
//!
//! [processing]
//! max_processes = 4         # Max grayscale workers (omit for auto = CPU cores)
//!
//! [metrics]
//! sink = "log"              # log | none
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{EncodeSettings, PngCompression, Quality};
use crate::metrics::{LogSink, MetricsSink, NoopSink};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
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

/// Processor configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessorConfig {
    /// Output encoder settings.
    pub encoding: EncodingConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Where timing metrics go.
    pub metrics: MetricsConfig,
}

impl ProcessorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.encoding.jpeg_quality) {
            return Err(ConfigError::Validation(
                "encoding.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Encoder settings for the image backend.
    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            jpeg_quality: Quality::new(self.encoding.jpeg_quality),
            png_compression: self.encoding.png_compression,
        }
    }
}

/// Output encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    /// JPEG quality (1 = worst, 100 = best).
    pub jpeg_quality: u8,
    /// Deflate effort for PNG output.
    pub png_compression: PngCompression,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: Quality::default().value(),
            png_compression: PngCompression::default(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers for row-parallel operations.
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
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Metrics destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Emit each timing as a `tracing` debug event.
    #[default]
    Log,
    /// Drop all timings.
    None,
}

/// Metrics settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    pub sink: SinkKind,
}

impl MetricsConfig {
    /// Build the configured sink.
    pub fn build_sink(&self) -> Arc<dyn MetricsSink> {
        match self.sink {
            SinkKind::Log => Arc::new(LogSink),
            SinkKind::None => Arc::new(NoopSink),
        }
    }
}

/// Parse and validate config from a TOML string.
pub fn parse_config(content: &str) -> Result<ProcessorConfig, ConfigError> {
    let config: ProcessorConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file, or stock defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<ProcessorConfig, ConfigError> {
    match path {
        Some(path) => parse_config(&fs::read_to_string(path)?),
        None => Ok(ProcessorConfig::default()),
    }
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Darkroom Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output encoding
# ---------------------------------------------------------------------------
[encoding]
# JPEG quality (1 = worst, 100 = best). Used for JPEG sources and for PNG
# sources that turn out to be fully opaque.
jpeg_quality = 75

# PNG deflate effort: "fast", "default" or "best".
png_compression = "best"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of parallel workers for grayscale conversion.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_processes = 4

# ---------------------------------------------------------------------------
# Metrics
# ---------------------------------------------------------------------------
[metrics]
# "log" emits timings as debug-level log events, "none" drops them.
sink = "log"
"##
}
