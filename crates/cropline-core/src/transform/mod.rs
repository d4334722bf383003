//! Crop geometry and the crop stages of the processing pipeline.
//!
//! # Stage Order
//!
//! Within a request, cropping happens twice:
//! 1. [`crop`]: the user's crop, before rotation is applied to the pixels
//! 2. resize (outside this crate)
//! 3. [`crop_to_result`]: cut to the nominal result size
//!
//! # Coordinate System
//!
//! - Pixel coordinates, origin at the top-left corner
//! - Rotations are clockwise, in 90° steps
//! - User input (crop size, gravity) refers to the final displayed
//!   orientation; the crop itself runs on the current orientation

mod bounds;
mod crop;
mod gravity;
mod orientation;
mod smart;
mod stage;

pub use bounds::{clamp_to_source_if_bounded, scale_proportional};
pub use crop::{crop_image, crop_image_with};
pub use gravity::{resolve_position, Gravity, GravityKind};
pub use orientation::Orientation;
pub use smart::{smart_crop, SaliencyDetector};
pub use stage::{crop, crop_to_result, crop_to_result_with, crop_with, fill_down_size};
