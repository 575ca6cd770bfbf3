use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::prelude::*;
use burn::tensor::activation;

/// Rounds `value` to the nearest multiple of `divisor`, never dropping more
/// than 10% below it.
pub fn make_divisible(value: f64, divisor: usize) -> usize {
    let divisor_f = divisor as f64;
    let mut rounded = ((value + divisor_f / 2.0) / divisor_f).floor() as usize * divisor;
    rounded = rounded.max(divisor);
    if (rounded as f64) < 0.9 * value {
        rounded += divisor;
    }
    rounded
}

#[derive(Module, Debug)]
pub struct SqueezeExcitation<B: Backend> {
    fc1: Conv2d<B>,
    fc2: Conv2d<B>,
}

impl<B: Backend> SqueezeExcitation<B> {
    pub fn new(device: &B::Device, channels: usize, squeeze_factor: usize) -> Self {
        let squeezed = make_divisible(channels as f64 / squeeze_factor as f64, 8);

        Self {
            fc1: Conv2dConfig::new([channels, squeezed], [1, 1]).init(device),
            fc2: Conv2dConfig::new([squeezed, channels], [1, 1]).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, _, height, width] = x.dims();

        let scale = x.clone().mean_dim(3).mean_dim(2);
        let scale = activation::relu(self.fc1.forward(scale));
        let scale = activation::hard_sigmoid(self.fc2.forward(scale), 1.0 / 6.0, 0.5);

        x * scale.repeat_dim(2, height).repeat_dim(3, width)
    }
}
