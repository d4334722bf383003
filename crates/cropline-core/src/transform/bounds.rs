//! Dimension helpers shared by the crop executor and the result stage.
//!
//! A requested dimension of `0` means "unconstrained" throughout the crop
//! stage, so these helpers keep zero distinct from "one pixel".

/// Clamp a requested dimension to the source, treating `0` as unbounded.
///
/// Returns `source` when `requested == 0`, otherwise `min(requested, source)`.
/// The result never exceeds `source`.
///
/// # Example
///
/// ```ignore
/// assert_eq!(clamp_to_source_if_bounded(0, 640), 640);
/// assert_eq!(clamp_to_source_if_bounded(320, 640), 320);
/// assert_eq!(clamp_to_source_if_bounded(900, 640), 640);
/// ```
#[inline]
pub fn clamp_to_source_if_bounded(requested: u32, source: u32) -> u32 {
    if requested == 0 {
        source
    } else {
        requested.min(source)
    }
}

/// Scale a dimension by `ratio`, rounding half away from zero.
///
/// Both axes of a size go through this same rounding, which keeps a scaled
/// size within one pixel of the original aspect ratio. Zero stays zero (it
/// means "unconstrained"), and a positive dimension never collapses to zero.
#[inline]
pub fn scale_proportional(dimension: u32, ratio: f64) -> u32 {
    if dimension == 0 || !(ratio > 0.0) {
        return 0;
    }

    // `as` saturates, so huge ratios land on u32::MAX instead of wrapping
    let scaled = (dimension as f64 * ratio).round() as u32;
    scaled.max(1)
}
