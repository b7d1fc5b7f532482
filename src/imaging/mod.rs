//! Image processing in pure Rust, built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Crop** | bilinear cover resize + anchored `crop_imm` |
//! | **Resize** | bilinear contain resize, skipped when nothing changes |
//! | **GrayScale** | row-parallel luminance with `rayon` |
//! | **Watermark** | half-width overlay, uniform-opacity "over" blend |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and anchor math (unit testable)
//! - **Parameters**: Crop anchors and encoder settings
//! - **Format**: Opacity-driven output codec selection
//! - **Backend**: [`ImageProcessor`] trait + [`RustProcessor`]

pub mod backend;
pub mod calculations;
pub mod format;
mod params;
pub mod rust_backend;

pub use backend::{ImageProcessor, ProcessorError};
pub use format::{OutputFormat, SourceFormat, is_opaque, select_output_format};
pub use params::{CropPoint, EncodeSettings, PngCompression, Quality};
pub use rust_backend::RustProcessor;
