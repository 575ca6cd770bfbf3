use std::path::Path;

use anyhow::{ensure, Result};
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{relu, softmax};

use super::backbone::{MobileNetV3Backbone, BACKBONE_CHANNELS};
use super::loss::global_average_pool;

/// Hidden width of the dense head.
pub const HEAD_HIDDEN: usize = 1024;

/// Frozen MobileNetV3 backbone with a pooled dense classification head.
///
/// Stands on its own; the dehaze/fusion network does not feed into it.
#[derive(Module, Debug)]
pub struct BackboneClassifier<B: Backend> {
    backbone: MobileNetV3Backbone<B>,
    hidden: Linear<B>,
    output: Linear<B>,
    num_classes: usize,
}

impl<B: Backend> BackboneClassifier<B> {
    pub fn new(device: &B::Device, num_classes: usize) -> Result<Self> {
        Self::with_backbone(device, MobileNetV3Backbone::new(device), num_classes)
    }

    /// Builds the classifier around pretrained backbone weights.
    pub fn pretrained(device: &B::Device, weights: &Path, num_classes: usize) -> Result<Self> {
        let backbone = MobileNetV3Backbone::new(device).load_weights(weights, device)?;
        Self::with_backbone(device, backbone, num_classes)
    }

    fn with_backbone(
        device: &B::Device,
        backbone: MobileNetV3Backbone<B>,
        num_classes: usize,
    ) -> Result<Self> {
        ensure!(num_classes > 0, "num_classes must be positive");

        log::info!(
            "BackboneClassifier: frozen backbone -> {} -> {} classes",
            HEAD_HIDDEN,
            num_classes
        );

        Ok(Self {
            backbone: backbone.no_grad(),
            hidden: LinearConfig::new(BACKBONE_CHANNELS, HEAD_HIDDEN).init(device),
            output: LinearConfig::new(HEAD_HIDDEN, num_classes).init(device),
            num_classes,
        })
    }

    /// Raw class scores `[B, num_classes]`.
    pub fn logits(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = self.backbone.forward(images).detach();
        let pooled = global_average_pool(features);
        let hidden = relu(self.hidden.forward(pooled));
        self.output.forward(hidden)
    }

    /// Class probabilities `[B, num_classes]`.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.logits(images), 1)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    #[test]
    fn test_probabilities_sum_to_one() {
        let device = Default::default();
        let classifier = BackboneClassifier::<TestBackend>::new(&device, 4).unwrap();
        let images =
            Tensor::<TestBackend, 4>::random([2, 3, 64, 64], Distribution::Uniform(0.0, 1.0), &device);

        let probs = classifier.forward(images);
        assert_eq!(probs.dims(), [2, 4]);

        let sums = probs.sum_dim(1).into_data().to_vec::<f32>().unwrap();
        for sum in sums {
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rejects_zero_classes() {
        let device = Default::default();
        assert!(BackboneClassifier::<TestBackend>::new(&device, 0).is_err());
    }

    #[test]
    fn test_missing_weights_is_an_error() {
        let device = Default::default();
        let result = BackboneClassifier::<TestBackend>::pretrained(
            &device,
            Path::new("does/not/exist/backbone"),
            3,
        );
        assert!(result.is_err());
    }
}
