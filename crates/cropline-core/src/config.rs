//! Engine configuration.

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::metrics::MetricsConfig;

/// Settings shared by every request the engine processes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest number of pixels a materialization may copy (`None` = no cap).
    pub max_pixels: Option<u64>,
    pub metrics: MetricsConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and
    /// `ConfigError::Invalid` for values that fail [`EngineConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        debug!(
            max_pixels = ?config.max_pixels,
            metrics = config.metrics.enabled,
            "loaded engine config"
        );
        Ok(config)
    }

    /// Reject values the engine can't work with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `max_pixels` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pixels == Some(0) {
            return Err(ConfigError::Invalid("max_pixels must be greater than 0".to_string()));
        }
        Ok(())
    }
}
