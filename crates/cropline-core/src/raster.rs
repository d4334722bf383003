//! The image handle the crop stage works on.
//!
//! [`PipelineImage`] is the capability set the crop stage needs from a pixel
//! backend: dimensions, an in-place crop, and a way to force the pixels into
//! a self-contained buffer. [`RasterImage`] is the production
//! implementation on top of the `image` crate.
//!
//! # Lazy views
//!
//! Cropping a [`RasterImage`] does not copy pixels. It narrows a view onto a
//! shared buffer, exactly like a lazily evaluated operation graph would.
//! [`PipelineImage::materialize`] copies the view into a fresh buffer. Code
//! that needs to read pixels (the content-aware path) must materialize first,
//! and must materialize again after cropping before any later stage runs.

use std::sync::Arc;

use image::{DynamicImage, GenericImageView};

use crate::error::CropError;

/// Pixel backend capabilities used by the crop stage.
pub trait PipelineImage {
    /// Current width in pixels.
    fn width(&self) -> u32;

    /// Current height in pixels.
    fn height(&self) -> u32;

    /// Crop in place to `width x height` at `(left, top)`.
    ///
    /// # Errors
    ///
    /// Returns `CropError::InvalidGeometry` if the rectangle is empty or does
    /// not fit inside the current image.
    fn crop(&mut self, left: u32, top: u32, width: u32, height: u32) -> Result<(), CropError>;

    /// Force the pixels into a fully materialized, self-contained buffer.
    ///
    /// # Errors
    ///
    /// Returns `CropError::Materialization` if the buffer can't be produced.
    fn materialize(&mut self) -> Result<(), CropError>;

    /// The pixels, if the image is currently materialized.
    fn materialized(&self) -> Option<&DynamicImage>;
}

/// Visible window onto a shared pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct View {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

/// An owned image whose crops are lazy views onto a shared buffer.
#[derive(Debug, Clone)]
pub struct RasterImage {
    buffer: Arc<DynamicImage>,
    view: View,
    max_pixels: Option<u64>,
}

impl RasterImage {
    /// Wrap decoded pixels. The whole image is visible.
    pub fn new(image: DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            buffer: Arc::new(image),
            view: View {
                left: 0,
                top: 0,
                width,
                height,
            },
            max_pixels: None,
        }
    }

    /// Cap the number of pixels a materialization may copy.
    pub fn with_max_pixels(mut self, max_pixels: Option<u64>) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    /// Whether the view covers the whole backing buffer.
    pub fn is_materialized(&self) -> bool {
        self.view.left == 0
            && self.view.top == 0
            && (self.view.width, self.view.height) == self.buffer.dimensions()
    }

    /// Materialize and hand out the pixels.
    ///
    /// # Errors
    ///
    /// Returns `CropError::Materialization` if the view exceeds the pixel cap.
    pub fn into_dynamic(mut self) -> Result<DynamicImage, CropError> {
        self.materialize()?;
        Ok(Arc::try_unwrap(self.buffer).unwrap_or_else(|shared| (*shared).clone()))
    }
}

impl PipelineImage for RasterImage {
    fn width(&self) -> u32 {
        self.view.width
    }

    fn height(&self) -> u32 {
        self.view.height
    }

    fn crop(&mut self, left: u32, top: u32, width: u32, height: u32) -> Result<(), CropError> {
        let fits_x = left.checked_add(width).is_some_and(|right| right <= self.view.width);
        let fits_y = top.checked_add(height).is_some_and(|bottom| bottom <= self.view.height);

        if width == 0 || height == 0 || !fits_x || !fits_y {
            return Err(CropError::InvalidGeometry {
                left,
                top,
                width,
                height,
                image_width: self.view.width,
                image_height: self.view.height,
            });
        }

        self.view = View {
            left: self.view.left + left,
            top: self.view.top + top,
            width,
            height,
        };
        Ok(())
    }

    fn materialize(&mut self) -> Result<(), CropError> {
        if self.is_materialized() {
            return Ok(());
        }

        let View {
            left,
            top,
            width,
            height,
        } = self.view;

        if let Some(limit) = self.max_pixels {
            if width as u64 * height as u64 > limit {
                return Err(CropError::Materialization {
                    width,
                    height,
                    limit,
                });
            }
        }

        self.buffer = Arc::new(self.buffer.crop_imm(left, top, width, height));
        self.view = View {
            left: 0,
            top: 0,
            width,
            height,
        };
        Ok(())
    }

    fn materialized(&self) -> Option<&DynamicImage> {
        self.is_materialized().then(|| self.buffer.as_ref())
    }
}
