use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Layout of the dehaze + fusion network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Channels of the input image.
    pub input_channels: usize,
    /// Width of every convolution inside the dehazing module.
    pub filters: usize,
    /// Channels produced by each feature extractor.
    pub feature_channels: usize,
    /// Channel reduction inside the attention fusion bottleneck.
    pub reduction_ratio: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_channels: 3,
            filters: 64,
            feature_channels: 32,
            reduction_ratio: 16,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.input_channels > 0,
            "input_channels must be positive"
        );
        ensure!(self.filters > 0, "filters must be positive");
        ensure!(
            self.feature_channels > 0,
            "feature_channels must be positive"
        );
        ensure!(
            self.reduction_ratio > 0,
            "reduction_ratio must be positive"
        );
        ensure!(
            self.feature_channels % self.reduction_ratio == 0,
            "reduction_ratio {} does not divide feature_channels {}",
            self.reduction_ratio,
            self.feature_channels
        );
        Ok(())
    }

    /// Channels of the fusion bottleneck.
    pub fn reduced_channels(&self) -> usize {
        self.feature_channels / self.reduction_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ModelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reduced_channels(), 2);
    }

    #[test]
    fn test_rejects_non_dividing_ratio() {
        let config = ModelConfig {
            reduction_ratio: 5,
            ..ModelConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("does not divide"));
    }

    #[test]
    fn test_rejects_zero_filters() {
        let config = ModelConfig {
            filters: 0,
            ..ModelConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
