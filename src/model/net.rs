use anyhow::Result;
use burn::prelude::*;

use super::config::ModelConfig;
use super::dehaze::DehazeModule;
use super::extractor::FeatureExtractor;
use super::fusion::HazeAwareFusion;

/// Every intermediate of one forward pass.
#[derive(Debug, Clone)]
pub struct FusionOutput<B: Backend> {
    pub dehazed: Tensor<B, 4>,
    pub hazy_features: Tensor<B, 4>,
    pub dehazed_features: Tensor<B, 4>,
    pub fused: Tensor<B, 4>,
}

/// hazy image -> dehaze -> two feature extractors -> attention fusion.
#[derive(Module, Debug)]
pub struct DehazeFusionNet<B: Backend> {
    pub dehaze: DehazeModule<B>,
    pub hazy_extractor: FeatureExtractor<B>,
    pub dehazed_extractor: FeatureExtractor<B>,
    pub fusion: HazeAwareFusion<B>,
}

impl<B: Backend> DehazeFusionNet<B> {
    pub fn new(device: &B::Device, config: &ModelConfig) -> Result<Self> {
        config.validate()?;

        log::info!(
            "DehazeFusionNet: {} -> {} feature channels, reduction {}",
            config.input_channels,
            config.feature_channels,
            config.reduction_ratio
        );

        Ok(Self {
            dehaze: DehazeModule::new(device, config),
            hazy_extractor: FeatureExtractor::new(
                device,
                config.input_channels,
                config.feature_channels,
            ),
            dehazed_extractor: FeatureExtractor::new(
                device,
                config.input_channels,
                config.feature_channels,
            ),
            fusion: HazeAwareFusion::new(device, config.feature_channels, config.reduction_ratio),
        })
    }

    pub fn forward_all(&self, hazy: Tensor<B, 4>) -> FusionOutput<B> {
        let dehazed = self.dehaze.forward(hazy.clone());
        let hazy_features = self.hazy_extractor.forward(hazy);
        let dehazed_features = self.dehazed_extractor.forward(dehazed.clone());
        let fused = self
            .fusion
            .forward(hazy_features.clone(), dehazed_features.clone());

        FusionOutput {
            dehazed,
            hazy_features,
            dehazed_features,
            fused,
        }
    }

    /// Fused feature map `[B, feature_channels, H, W]`.
    pub fn forward(&self, hazy: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward_all(hazy).fused
    }
}
