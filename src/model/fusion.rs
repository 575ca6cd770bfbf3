use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig};
use burn::prelude::*;
use burn::tensor::activation::{relu, sigmoid};

/// Per-location convex combination `hazy * A + dehazed * (1 - A)`.
pub fn blend_features<B: Backend>(
    hazy: Tensor<B, 4>,
    dehazed: Tensor<B, 4>,
    attention: Tensor<B, 4>,
) -> Tensor<B, 4> {
    let inverse = attention.clone().neg() + 1.0;
    hazy * attention + dehazed * inverse
}

/// Coordinate-attention fusion of hazy and dehazed feature maps.
///
/// Both inputs are `[B, C, H, W]`. The summed map is pooled along each
/// spatial axis, the two descriptors share a bottleneck, and the product of
/// their projections gives an attention map that weights the hazy branch.
#[derive(Module, Debug)]
pub struct HazeAwareFusion<B: Backend> {
    reduce: Conv2d<B>,
    bn: BatchNorm<B>,
    expand_h: Conv2d<B>,
    expand_w: Conv2d<B>,
}

impl<B: Backend> HazeAwareFusion<B> {
    /// `channels` must be divisible by `reduction_ratio`; see `ModelConfig::validate`.
    pub fn new(device: &B::Device, channels: usize, reduction_ratio: usize) -> Self {
        let reduced = channels / reduction_ratio;

        Self {
            reduce: Conv2dConfig::new([channels, reduced], [1, 1]).init(device),
            bn: BatchNormConfig::new(reduced).init(device),
            expand_h: Conv2dConfig::new([reduced, channels], [1, 1]).init(device),
            expand_w: Conv2dConfig::new([reduced, channels], [1, 1]).init(device),
        }
    }

    /// Attention map `A` of shape `[B, C, H, W]`, values in [0, 1].
    pub fn attention_map(&self, hazy: Tensor<B, 4>, dehazed: Tensor<B, 4>) -> Tensor<B, 4> {
        let [batch, _, height, width] = hazy.dims();
        let summed = hazy + dehazed;

        // [B, C, H, 1] and [B, C, W, 1]
        let pooled_w = summed.clone().mean_dim(3);
        let pooled_h = summed.mean_dim(2).swap_dims(2, 3);

        let spliced = Tensor::cat(vec![pooled_w, pooled_h], 2);
        let spliced = relu(self.bn.forward(self.reduce.forward(spliced)));
        let [_, reduced, _, _] = spliced.dims();

        let along_h = spliced
            .clone()
            .slice([0..batch, 0..reduced, 0..height, 0..1]);
        let along_w = spliced.slice([0..batch, 0..reduced, height..height + width, 0..1]);

        let along_h = self.expand_h.forward(along_h);
        let along_w = self.expand_w.forward(along_w).swap_dims(2, 3);

        // [B, C, H, 1] x [B, C, 1, W] -> [B, C, H, W]
        let along_h = along_h.repeat_dim(3, width);
        let along_w = along_w.repeat_dim(2, height);
        sigmoid(along_h * along_w)
    }

    pub fn forward(&self, hazy: Tensor<B, 4>, dehazed: Tensor<B, 4>) -> Tensor<B, 4> {
        let attention = self.attention_map(hazy.clone(), dehazed.clone());
        blend_features(hazy, dehazed, attention)
    }
}
