use anyhow::Result;
use burn::prelude::*;

use crate::model::{compute_total_loss, ClassificationProbe, DehazeFusionNet, ModelConfig};

/// The fused network plus the task head that supplies `L_det`.
#[derive(Module, Debug)]
pub struct TrainingModel<B: Backend> {
    pub net: DehazeFusionNet<B>,
    pub probe: ClassificationProbe<B>,
}

impl<B: Backend> TrainingModel<B> {
    pub fn new(device: &B::Device, config: &ModelConfig, num_classes: usize) -> Result<Self> {
        anyhow::ensure!(num_classes > 0, "num_classes must be positive");

        Ok(Self {
            net: DehazeFusionNet::new(device, config)?,
            probe: ClassificationProbe::new(device, config.feature_channels, num_classes),
        })
    }

    /// `L_det + alpha * L_hr` for one batch.
    pub fn loss(&self, images: Tensor<B, 4>, labels: Tensor<B, 1, Int>, alpha: f32) -> Tensor<B, 1> {
        let out = self.net.forward_all(images);
        let detection = self.probe.loss(out.fused, labels);

        compute_total_loss(detection, out.hazy_features, out.dehazed_features, alpha)
    }
}
