//! Content-aware crop placement.
//!
//! Saliency analysis itself is an external capability, injected as a
//! [`SaliencyDetector`]. This module owns the ordering contract around it:
//! the pixels are materialized before the detector reads them, and the
//! cropped result is materialized again before any later stage can touch it.

use image::DynamicImage;
use tracing::debug;

use crate::error::CropError;
use crate::raster::PipelineImage;

/// Finds the most salient `width x height` window of an image.
pub trait SaliencyDetector: Send + Sync {
    /// Return the top-left corner of the chosen window.
    ///
    /// # Errors
    ///
    /// Returns `CropError::Saliency` if the analysis fails.
    fn find_crop(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<(u32, u32), CropError>;
}

/// Crop to `width x height` at the position chosen by `detector`.
///
/// Materializes the image before the analysis and again after the crop.
/// The detector's answer is clamped into the image.
///
/// # Errors
///
/// Propagates materialization, detector and crop failures; nothing is
/// cropped if the first materialization or the detector fails.
pub fn smart_crop<I: PipelineImage + ?Sized>(
    image: &mut I,
    width: u32,
    height: u32,
    detector: &dyn SaliencyDetector,
) -> Result<(), CropError> {
    image.materialize()?;

    let pixels = image
        .materialized()
        .ok_or_else(|| CropError::Saliency("image is not materialized".to_string()))?;
    let (left, top) = detector.find_crop(pixels, width, height)?;

    let left = left.min(image.width().saturating_sub(width));
    let top = top.min(image.height().saturating_sub(height));
    debug!(left, top, width, height, "smart crop");

    image.crop(left, top, width, height)?;
    image.materialize()
}
