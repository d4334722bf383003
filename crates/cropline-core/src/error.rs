//! Error types for the crop stage.

use thiserror::Error;

/// Failures surfaced by cropping, materialization and content-aware placement.
///
/// None of these are retried: cropping is deterministic, so a failure is
/// reported once for the request that hit it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CropError {
    /// The in-place crop rejected a rectangle outside the image or of zero size.
    #[error("Invalid crop geometry: {width}x{height} at ({left}, {top}) on a {image_width}x{image_height} image")]
    InvalidGeometry {
        left: u32,
        top: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    /// Forcing the pixel buffer into memory failed.
    #[error("Can't materialize {width}x{height} image: exceeds the limit of {limit} pixels")]
    Materialization { width: u32, height: u32, limit: u64 },

    /// The injected saliency detector failed.
    #[error("Saliency detection failed: {0}")]
    Saliency(String),
}

impl CropError {
    /// Label used for the `errors_total{type}` counter.
    pub fn kind(&self) -> &'static str {
        match self {
            CropError::InvalidGeometry { .. } => "geometry",
            CropError::Materialization { .. } => "materialization",
            CropError::Saliency(_) => "saliency",
        }
    }
}

/// Errors raised while loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document is not valid JSON for the schema.
    #[error("Can't parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document parsed but holds an unusable value.
    #[error("Invalid config: {0}")]
    Invalid(String),
}
