//! Cropline Core - Crop resolution engine
//!
//! This crate decides where an image is cut: it resolves gravity to pixel
//! origins, maps crops requested in the displayed orientation back onto
//! images that still have rotation and flip pending, and performs the two
//! crop stages of an image-processing pipeline.

pub mod config;
pub mod error;
pub mod metrics;
pub mod options;
pub mod pipeline;
pub mod raster;
pub mod transform;

pub use config::EngineConfig;
pub use error::{ConfigError, CropError};
pub use metrics::{InMemoryMetrics, Metrics, MetricsConfig, NoopMetrics, Segment};
pub use options::{PipelineState, ProcessingOptions, ResizingType};
pub use pipeline::Pipeline;
pub use raster::{PipelineImage, RasterImage};
pub use transform::{
    crop, crop_image, crop_to_result, resolve_position, Gravity, GravityKind, Orientation,
    SaliencyDetector,
};
