//! The two pipeline stages that crop.
//!
//! - [`crop`] runs early, before rotation is applied to the pixels. The
//!   requested crop and its gravity are expressed in the final displayed
//!   orientation, so both are mapped back onto the image's current
//!   orientation first.
//! - [`crop_to_result`] runs after resizing, when rotation is already
//!   applied, and cuts the image to the nominal result size.

use tracing::debug;

use super::bounds::scale_proportional;
use super::crop::crop_image_with;
use super::smart::SaliencyDetector;
use crate::error::CropError;
use crate::options::{PipelineState, ProcessingOptions, ResizingType};
use crate::raster::PipelineImage;

/// Apply the crop requested in `state` to an image that still has the
/// accumulated orientation and the request's rotation pending.
///
/// # Errors
///
/// Propagates failures of the crop executor.
pub fn crop<I: PipelineImage + ?Sized>(
    state: &PipelineState,
    image: &mut I,
    options: &ProcessingOptions,
) -> Result<(), CropError> {
    crop_with(state, image, options, None)
}

/// Same as [`crop`], with an optional saliency detector for `Smart` gravity.
///
/// # Errors
///
/// Propagates failures of the crop executor.
pub fn crop_with<I: PipelineImage + ?Sized>(
    state: &PipelineState,
    image: &mut I,
    options: &ProcessingOptions,
    saliency: Option<&dyn SaliencyDetector>,
) -> Result<(), CropError> {
    let (mut width, mut height) = (state.crop_width, state.crop_height);

    // Auto-rotation first, then the request's own rotation
    let pending = state.orientation.then(options.rotation());

    let frame = if pending.swaps_axes() {
        (image.height(), image.width())
    } else {
        (image.width(), image.height())
    };
    let gravity = state.crop_gravity.reorient(pending, frame, (width, height));

    // Width and height refer to the final orientation
    if pending.swaps_axes() {
        std::mem::swap(&mut width, &mut height);
        debug!(
            angle = pending.degrees(),
            width, height, "swapped crop dimensions for pending rotation"
        );
    }

    crop_image_with(image, width, height, &gravity, saliency)
}

/// Crop an already resized image to the nominal result size.
///
/// `state` mirrors [`crop`] and is not read: rotation is fully applied by now.
///
/// # Errors
///
/// Propagates failures of the crop executor.
pub fn crop_to_result<I: PipelineImage + ?Sized>(
    state: &PipelineState,
    image: &mut I,
    options: &ProcessingOptions,
) -> Result<(), CropError> {
    crop_to_result_with(state, image, options, None)
}

/// Same as [`crop_to_result`], with an optional saliency detector.
///
/// # Errors
///
/// Propagates failures of the crop executor.
pub fn crop_to_result_with<I: PipelineImage + ?Sized>(
    _state: &PipelineState,
    image: &mut I,
    options: &ProcessingOptions,
    saliency: Option<&dyn SaliencyDetector>,
) -> Result<(), CropError> {
    let (mut width, mut height) = options.result_size();

    if options.resizing_type == ResizingType::FillDown {
        let corrected = fill_down_size((width, height), (image.width(), image.height()));
        if corrected != (width, height) {
            debug!(
                result_width = width,
                result_height = height,
                width = corrected.0,
                height = corrected.1,
                "fill-down shrank result size"
            );
        }
        (width, height) = corrected;
    }

    crop_image_with(image, width, height, &options.gravity, saliency)
}

/// Shrink a nominal result size that the image can't fill without upscaling.
///
/// When the image is smaller than the result on an axis, that axis is set to
/// the image size and the other axis is scaled by the same ratio, so the
/// result keeps the requested aspect ratio.
pub fn fill_down_size(result: (u32, u32), image: (u32, u32)) -> (u32, u32) {
    let (mut width, mut height) = result;
    let (image_width, image_height) = image;

    if width > image_width {
        height = scale_proportional(height, image_width as f64 / width as f64);
        width = image_width;
    }

    if height > image_height {
        width = scale_proportional(width, image_height as f64 / height as f64);
        height = image_height;
    }

    (width, height)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::raster::tests::{MockImage, RecordedOp};
    use crate::transform::{Gravity, GravityKind, Orientation};
    use proptest::prelude::*;

    fn gravity_strategy() -> impl Strategy<Value = Gravity> {
        let kind = prop_oneof![
            Just(GravityKind::Center),
            Just(GravityKind::NorthEast),
            Just(GravityKind::South),
            Just(GravityKind::Smart),
            Just(GravityKind::FocusPoint),
            Just(GravityKind::Absolute),
        ];
        (kind, -200.0f64..=200.0, -200.0f64..=200.0)
            .prop_map(|(k, x, y)| Gravity::new(k).with_offset(x, y))
    }

    proptest! {
        /// Property: the pipeline stage always issues an in-bounds crop.
        #[test]
        fn prop_stage_crop_in_bounds(
            (width, height) in (1u32..=300, 1u32..=300),
            (crop_w, crop_h) in (0u32..=400, 0u32..=400),
            quarter_turns in 0u8..4,
            flip in any::<bool>(),
            rotate in prop_oneof![Just(0), Just(90), Just(180), Just(270)],
            gravity in gravity_strategy(),
        ) {
            let mut img = MockImage::new(width, height);
            let st = PipelineState::new()
                .with_orientation(Orientation::new(quarter_turns, flip))
                .with_crop(crop_w, crop_h, gravity);
            let mut po = ProcessingOptions::default();
            po.rotate = rotate;

            prop_assert!(crop(&st, &mut img, &po).is_ok());

            for op in img.crops() {
                if let RecordedOp::Crop { left, top, width: w, height: h } = op {
                    prop_assert!(left + w <= width);
                    prop_assert!(top + h <= height);
                }
            }
        }

        /// Property: fill-down never exceeds the image and keeps the requested
        /// aspect ratio within rounding.
        #[test]
        fn prop_fill_down_within_image(
            (result_w, result_h) in (1u32..=2000, 1u32..=2000),
            (image_w, image_h) in (1u32..=2000, 1u32..=2000),
        ) {
            let (w, h) = fill_down_size((result_w, result_h), (image_w, image_h));

            prop_assert!(w <= image_w);
            prop_assert!(h <= image_h);
            prop_assert!(w <= result_w && h <= result_h);
        }
    }
}
