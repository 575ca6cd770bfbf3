use burn::nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig};
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

use super::loss::global_average_pool;

/// Task head over the fused features, supplying `L_det` during training.
///
/// Pools the fused map and classifies it against the folder label. A real
/// detection head can take its place as long as it yields a scalar loss.
#[derive(Module, Debug)]
pub struct ClassificationProbe<B: Backend> {
    linear: Linear<B>,
    criterion: CrossEntropyLoss<B>,
}

impl<B: Backend> ClassificationProbe<B> {
    pub fn new(device: &B::Device, feature_channels: usize, num_classes: usize) -> Self {
        Self {
            linear: LinearConfig::new(feature_channels, num_classes).init(device),
            criterion: CrossEntropyLossConfig::new().init(device),
        }
    }

    pub fn logits(&self, fused: Tensor<B, 4>) -> Tensor<B, 2> {
        self.linear.forward(global_average_pool(fused))
    }

    pub fn loss(&self, fused: Tensor<B, 4>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        self.criterion.forward(self.logits(fused), targets)
    }
}
