//! Request parameter normalization.
//!
//! Requests arrive as a loose `key → value` string map. [`ProcessParams`]
//! turns that map into typed fields once, at the boundary. Nothing here can
//! fail: malformed numbers become 0 ("unspecified"), unknown anchors become
//! [`CropPoint::Center`], and unknown fit modes run no geometry step.

use crate::imaging::CropPoint;
use std::collections::HashMap;

pub const WIDTH: &str = "w";
pub const HEIGHT: &str = "h";
pub const FIT: &str = "fit";
pub const CROP: &str = "crop";
pub const MONO: &str = "mono";

/// Value of `mono` that requests grayscale.
pub const BLACK_HEX_CODE: &str = "000000";

/// Upper bound (exclusive) for any dimension.
const DIMENSION_LIMIT: i64 = 10_000;

/// Parse a dimension parameter, bounded to `[0, 9999]`.
///
/// Unparsable, zero, and negative input all yield 0. Larger values wrap
/// modulo 10000.
pub fn clean_int(input: &str) -> u32 {
    match input.parse::<i64>() {
        Ok(value) if value > 0 => (value % DIMENSION_LIMIT) as u32,
        _ => 0,
    }
}

/// Whole-pipeline geometry selected by the `fit` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// `fit` absent or empty: contain-resize when a dimension is given.
    #[default]
    None,
    /// `fit=crop`: cover-resize then crop.
    Crop,
    /// Any other value: no geometry step.
    Other,
}

impl FitMode {
    pub fn from_param(input: &str) -> Self {
        match input {
            "" => FitMode::None,
            "crop" => FitMode::Crop,
            _ => FitMode::Other,
        }
    }
}

/// Typed view of a request's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessParams {
    pub width: u32,
    pub height: u32,
    pub fit: FitMode,
    pub crop_point: CropPoint,
    pub grayscale: bool,
}

impl ProcessParams {
    /// Build from the raw map. Absent keys behave as empty strings; unknown
    /// keys are ignored.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let get = |key: &str| params.get(key).map(String::as_str).unwrap_or("");
        Self {
            width: clean_int(get(WIDTH)),
            height: clean_int(get(HEIGHT)),
            fit: FitMode::from_param(get(FIT)),
            crop_point: CropPoint::from_param(get(CROP)),
            grayscale: get(MONO) == BLACK_HEX_CODE,
        }
    }

    /// True if at least one dimension was given.
    pub fn has_dimensions(&self) -> bool {
        self.width != 0 || self.height != 0
    }
}
