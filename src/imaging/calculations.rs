//! Pure calculation functions for image geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Dimensions are `(width, height)` tuples throughout.

use super::params::CropPoint;

/// Calculate output dimensions for a "contain" resize.
///
/// - Both target sides zero: the original dimensions, no resize needed.
/// - One side zero: the other is derived from the original aspect ratio.
/// - Both sides set: the target is used as-is, aspect ratio is not enforced.
///
/// Derived sides are rounded to the nearest pixel and never drop below 1.
///
/// # Examples
/// ```
/// # use darkroom::imaging::calculations::contain_dimensions;
/// // 800x600 asked for 200 wide → 200x150
/// assert_eq!(contain_dimensions((200, 0), (800, 600)), (200, 150));
///
/// // nothing asked → untouched
/// assert_eq!(contain_dimensions((0, 0), (800, 600)), (800, 600));
/// ```
pub fn contain_dimensions(target: (u32, u32), original: (u32, u32)) -> (u32, u32) {
    let (tgt_w, tgt_h) = target;
    let (orig_w, orig_h) = original;

    match (tgt_w, tgt_h) {
        (0, 0) => original,
        (w, 0) => (w, scale_side(w, orig_h, orig_w)),
        (0, h) => (scale_side(h, orig_w, orig_h), h),
        (w, h) => (w, h),
    }
}

/// `side * num / den`, rounded, at least 1.
fn scale_side(side: u32, num: u32, den: u32) -> u32 {
    if den == 0 {
        return side.max(1);
    }
    let scaled = (side as f64 * num as f64 / den as f64).round() as u32;
    scaled.max(1)
}

/// Calculate dimensions needed to cover a target box (resize before crop).
///
/// The scale factor is the larger of the per-axis ratios, so one side matches
/// the target and the other may exceed it. Each side is rounded to the nearest
/// pixel and then raised to at least the target, so the result always covers
/// the box even when rounding would land one pixel short.
pub fn cover_dimensions(target: (u32, u32), original: (u32, u32)) -> (u32, u32) {
    let (tgt_w, tgt_h) = target;
    let (orig_w, orig_h) = original;

    if orig_w == 0 || orig_h == 0 {
        return target;
    }

    let w_ratio = tgt_w as f64 / orig_w as f64;
    let h_ratio = tgt_h as f64 / orig_h as f64;
    let scale = w_ratio.max(h_ratio);

    let w = (orig_w as f64 * scale).round() as u32;
    let h = (orig_h as f64 * scale).round() as u32;
    (w.max(tgt_w), h.max(tgt_h))
}

/// Resolve the final crop box for a requested crop.
///
/// A zero side means "unspecified" and is derived through
/// [`contain_dimensions`], so the crop never produces an empty image.
pub fn crop_box(target: (u32, u32), original: (u32, u32)) -> (u32, u32) {
    match target {
        (0, _) | (_, 0) => contain_dimensions(target, original),
        _ => target,
    }
}

/// Top-left origin of a `target` crop inside a `resized` image.
///
/// Centered axes use truncating division. `resized` is expected to cover
/// `target`; if it does not, the offending axis is pinned to 0.
pub fn crop_origin(resized: (u32, u32), target: (u32, u32), point: CropPoint) -> (u32, u32) {
    let spare_x = resized.0.saturating_sub(target.0);
    let spare_y = resized.1.saturating_sub(target.1);
    let mid_x = spare_x / 2;
    let mid_y = spare_y / 2;

    match point {
        CropPoint::Center => (mid_x, mid_y),
        CropPoint::Top => (mid_x, 0),
        CropPoint::Bottom => (mid_x, spare_y),
        CropPoint::Left => (0, mid_y),
        CropPoint::Right => (spare_x, mid_y),
        CropPoint::TopLeft => (0, 0),
        CropPoint::TopRight => (spare_x, 0),
        CropPoint::BottomLeft => (0, spare_y),
        CropPoint::BottomRight => (spare_x, spare_y),
    }
}

/// Size of a watermark overlay on a given base image.
///
/// The overlay is scaled to half the base width and keeps its own aspect
/// ratio. Both sides are truncated from the exact half width, so an odd base
/// width can yield a height one pixel taller than the truncated width implies.
pub fn watermark_dimensions(base: (u32, u32), overlay: (u32, u32)) -> (u32, u32) {
    let half = base.0 as f64 / 2.0;
    if overlay.0 == 0 {
        return (half as u32, 0);
    }
    let ratio = overlay.1 as f64 / overlay.0 as f64;
    (half as u32, (half * ratio) as u32)
}

/// Largest pixel count any resize may produce.
///
/// 9999×9999 fits; a side derived from an extreme aspect ratio may not.
pub const MAX_PIXELS: u64 = 1 << 27;

/// Whether an image of `dims` stays within [`MAX_PIXELS`].
pub fn within_pixel_budget(dims: (u32, u32)) -> bool {
    dims.0 as u64 * dims.1 as u64 <= MAX_PIXELS
}

/// Offset that centers `inner` inside `outer`.
///
/// Signed because an overlay may be taller than its base.
pub fn centered_offset(outer: (u32, u32), inner: (u32, u32)) -> (i64, i64) {
    (
        (outer.0 as i64 - inner.0 as i64) / 2,
        (outer.1 as i64 - inner.1 as i64) / 2,
    )
}
