//! Entry point tying configuration, metrics and the crop stages together.

use std::sync::Arc;

use image::DynamicImage;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::CropError;
use crate::metrics::{Metrics, Segment};
use crate::options::{PipelineState, ProcessingOptions};
use crate::raster::{PipelineImage, RasterImage};
use crate::transform::{self, SaliencyDetector};

/// Runs the crop stages of a request with the engine's collaborators.
#[derive(Clone)]
pub struct Pipeline {
    config: EngineConfig,
    metrics: Arc<dyn Metrics>,
    saliency: Option<Arc<dyn SaliencyDetector>>,
}

impl Pipeline {
    /// Create a pipeline reporting to the metrics sink described by `config`.
    pub fn new(config: EngineConfig) -> Self {
        let metrics = config.metrics.build();
        Self {
            config,
            metrics,
            saliency: None,
        }
    }

    /// Report to `metrics` instead of the configured sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Use `detector` for `Smart` gravity without a usable origin.
    pub fn with_saliency(mut self, detector: Arc<dyn SaliencyDetector>) -> Self {
        self.saliency = Some(detector);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<dyn Metrics> {
        &self.metrics
    }

    /// Wrap decoded pixels, honoring the configured pixel cap.
    pub fn load(&self, image: DynamicImage) -> RasterImage {
        RasterImage::new(image).with_max_pixels(self.config.max_pixels)
    }

    /// Run the early crop stage. See [`transform::crop`].
    ///
    /// # Errors
    ///
    /// Propagates the stage failure after counting it.
    pub fn crop<I: PipelineImage + ?Sized>(
        &self,
        state: &PipelineState,
        image: &mut I,
        options: &ProcessingOptions,
    ) -> Result<(), CropError> {
        let _timer = self.metrics.start_segment(Segment::Processing);
        let result = transform::crop_with(state, image, options, self.saliency.as_deref());
        self.observe("crop", result)
    }

    /// Run the crop to the result size. See [`transform::crop_to_result`].
    ///
    /// # Errors
    ///
    /// Propagates the stage failure after counting it.
    pub fn crop_to_result<I: PipelineImage + ?Sized>(
        &self,
        state: &PipelineState,
        image: &mut I,
        options: &ProcessingOptions,
    ) -> Result<(), CropError> {
        let _timer = self.metrics.start_segment(Segment::Processing);
        let saliency = self.saliency.as_deref();
        let result = transform::crop_to_result_with(state, image, options, saliency);
        self.observe("crop_to_result", result)
    }

    fn observe(&self, stage: &'static str, result: Result<(), CropError>) -> Result<(), CropError> {
        if let Err(err) = &result {
            debug!(stage, kind = err.kind(), error = %err, "crop stage failed");
            self.metrics.increment_errors_total(err.kind());
        }
        result
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("saliency", &self.saliency.is_some())
            .finish_non_exhaustive()
    }
}
