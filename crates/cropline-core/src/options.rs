//! Per-request processing options and the state threaded between stages.

use serde::{Deserialize, Serialize};

use crate::transform::{scale_proportional, Gravity, Orientation};

/// How the image is fitted into the requested result box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizingType {
    /// Fit inside the box, keeping the aspect ratio.
    #[default]
    Fit,
    /// Fill the box, cropping what overflows.
    Fill,
    /// Like `Fill`, but never upscale: the result may be smaller than the
    /// box while keeping the box's aspect ratio.
    FillDown,
    /// Stretch to the box, ignoring the aspect ratio.
    Force,
    /// `Fill` or `Fit` depending on whether source and box share orientation.
    Auto,
}

/// Options of a single transform request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    pub resizing_type: ResizingType,
    /// Requested result width (0 = derived from the height).
    pub width: u32,
    /// Requested result height (0 = derived from the width).
    pub height: u32,
    /// Device pixel ratio the result size is multiplied by.
    pub dpr: f64,
    /// Explicit clockwise rotation in degrees (multiple of 90).
    pub rotate: i32,
    /// Gravity of the final crop to the result size.
    pub gravity: Gravity,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            resizing_type: ResizingType::default(),
            width: 0,
            height: 0,
            dpr: 1.0,
            rotate: 0,
            gravity: Gravity::default(),
        }
    }
}

impl ProcessingOptions {
    /// Create options with a result size and defaults elsewhere.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Nominal result size: the requested box scaled by the pixel ratio.
    pub fn result_size(&self) -> (u32, u32) {
        (
            scale_proportional(self.width, self.dpr),
            scale_proportional(self.height, self.dpr),
        )
    }

    /// The explicit rotation of this request.
    pub fn rotation(&self) -> Orientation {
        Orientation::from_degrees(self.rotate)
    }
}

/// Transform parameters accumulated by earlier pipeline stages.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineState {
    /// Rotation and flip still pending on the image (auto-rotation).
    pub orientation: Orientation,
    /// Crop requested in the final orientation (0 = unconstrained).
    pub crop_width: u32,
    pub crop_height: u32,
    /// Gravity of the requested crop, in the final orientation.
    pub crop_gravity: Gravity,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the accumulated orientation from the EXIF tag of the source bytes.
    pub fn auto_rotated(bytes: &[u8]) -> Self {
        Self {
            orientation: Orientation::from_exif_bytes(bytes),
            ..Self::default()
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_crop(mut self, width: u32, height: u32, gravity: Gravity) -> Self {
        self.crop_width = width;
        self.crop_height = height;
        self.crop_gravity = gravity;
        self
    }

    /// Accumulated rotation in degrees.
    pub fn angle(&self) -> u32 {
        self.orientation.degrees()
    }

    /// Whether a horizontal flip is pending.
    pub fn flip(&self) -> bool {
        self.orientation.flip
    }
}
