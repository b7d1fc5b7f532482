//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are shared by
//! the dispatcher (which decides which operations to run) and the
//! [`backend`](super::backend) (which does the actual pixel work).
//!
//! ## Types
//!
//! - [`CropPoint`]: Anchor that decides which part of a cover-resized image survives a crop.
//! - [`Quality`]: JPEG encoding quality (1–100, default 75). Clamped on construction.
//! - [`PngCompression`]: Deflate effort for PNG output.
//! - [`EncodeSettings`]: Both of the above, carried by a backend.

use serde::{Deserialize, Serialize};

/// Anchor for a crop, one of nine fixed positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CropPoint {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl CropPoint {
    /// Every anchor, center first.
    pub const ALL: [CropPoint; 9] = [
        CropPoint::Center,
        CropPoint::Top,
        CropPoint::Bottom,
        CropPoint::Left,
        CropPoint::Right,
        CropPoint::TopLeft,
        CropPoint::TopRight,
        CropPoint::BottomLeft,
        CropPoint::BottomRight,
    ];

    /// Parse the `crop` request parameter.
    ///
    /// Matching is exact and case-sensitive. Anything unrecognized, including
    /// the empty string, is [`CropPoint::Center`].
    pub fn from_param(input: &str) -> Self {
        match input {
            "top" => CropPoint::Top,
            "top,left" => CropPoint::TopLeft,
            "top,right" => CropPoint::TopRight,
            "left" => CropPoint::Left,
            "right" => CropPoint::Right,
            "bottom" => CropPoint::Bottom,
            "bottom,left" => CropPoint::BottomLeft,
            "bottom,right" => CropPoint::BottomRight,
            _ => CropPoint::Center,
        }
    }
}

/// Quality setting for JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// Compression effort for PNG output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    Fast,
    Default,
    #[default]
    Best,
}

impl From<PngCompression> for image::codecs::png::CompressionType {
    fn from(level: PngCompression) -> Self {
        match level {
            PngCompression::Fast => Self::Fast,
            PngCompression::Default => Self::Default,
            PngCompression::Best => Self::Best,
        }
    }
}

/// Encoder settings applied to every output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeSettings {
    pub jpeg_quality: Quality,
    pub png_compression: PngCompression,
}
