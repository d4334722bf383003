//! Crop executor: turn a requested crop size and a gravity into one in-place
//! crop of the image.
//!
//! # Behavior
//!
//! - `0x0` requests nothing and leaves the image untouched
//! - A `0` on one axis keeps that axis at full size
//! - Requests larger than the image are clamped to it; if nothing is left to
//!   cut, the image is left untouched
//! - `Smart` gravity with an origin that fits is applied directly, without
//!   any saliency analysis
//! - Everything else is placed by [`resolve_position`]

use tracing::trace;

use super::bounds::clamp_to_source_if_bounded;
use super::gravity::{resolve_position, Gravity, GravityKind};
use super::smart::{smart_crop, SaliencyDetector};
use crate::error::CropError;
use crate::raster::PipelineImage;

/// Crop `image` in place to `crop_width x crop_height` anchored by `gravity`.
///
/// `Smart` gravity whose origin does not fit falls back to the center.
///
/// # Errors
///
/// Propagates any failure of the underlying in-place crop.
pub fn crop_image<I: PipelineImage + ?Sized>(
    image: &mut I,
    crop_width: u32,
    crop_height: u32,
    gravity: &Gravity,
) -> Result<(), CropError> {
    crop_image_with(image, crop_width, crop_height, gravity, None)
}

/// Same as [`crop_image`], with an optional saliency detector.
///
/// When a detector is given, `Smart` gravity whose origin does not fit runs
/// the full content-aware path (see [`smart_crop`]) instead of falling back
/// to the center.
///
/// # Errors
///
/// Propagates crop, materialization and detector failures.
pub fn crop_image_with<I: PipelineImage + ?Sized>(
    image: &mut I,
    crop_width: u32,
    crop_height: u32,
    gravity: &Gravity,
    saliency: Option<&dyn SaliencyDetector>,
) -> Result<(), CropError> {
    if crop_width == 0 && crop_height == 0 {
        return Ok(());
    }

    let (image_width, image_height) = (image.width(), image.height());

    let crop_width = clamp_to_source_if_bounded(crop_width, image_width);
    let crop_height = clamp_to_source_if_bounded(crop_height, image_height);

    if crop_width >= image_width && crop_height >= image_height {
        trace!(image_width, image_height, "crop covers the whole image, skipping");
        return Ok(());
    }

    let origin = gravity.smart_origin(image_width, image_height, crop_width, crop_height);
    if let Some((left, top)) = origin {
        trace!(left, top, crop_width, crop_height, "using precomputed smart origin");
        return image.crop(left, top, crop_width, crop_height);
    }

    if gravity.kind == GravityKind::Smart {
        if let Some(detector) = saliency {
            return smart_crop(image, crop_width, crop_height, detector);
        }
    }

    let (left, top) = resolve_position(image_width, image_height, crop_width, crop_height, gravity);
    trace!(
        left,
        top,
        crop_width,
        crop_height,
        gravity = ?gravity.kind,
        "resolved crop"
    );

    image.crop(left, top, crop_width, crop_height)
}
