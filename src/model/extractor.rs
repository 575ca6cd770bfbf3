use burn::nn::conv::Conv2d;
use burn::nn::{BatchNorm, BatchNormConfig};
use burn::prelude::*;
use burn::tensor::activation;

use super::blocks::same_conv;

/// Shallow encoder: conv -> batchnorm -> relu -> conv.
#[derive(Module, Debug)]
pub struct FeatureExtractor<B: Backend> {
    conv1: Conv2d<B>,
    bn: BatchNorm<B>,
    conv2: Conv2d<B>,
}

impl<B: Backend> FeatureExtractor<B> {
    pub fn new(device: &B::Device, in_channels: usize, out_channels: usize) -> Self {
        Self {
            conv1: same_conv(device, in_channels, out_channels, 3, 1),
            bn: BatchNormConfig::new(out_channels).init(device),
            conv2: same_conv(device, out_channels, out_channels, 3, 1),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv1.forward(x);
        let x = self.bn.forward(x);
        let x = activation::relu(x);
        self.conv2.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    #[test]
    fn test_extractor_shape() {
        let device = Default::default();
        let extractor = FeatureExtractor::<TestBackend>::new(&device, 3, 32);
        let x = Tensor::<TestBackend, 4>::random([2, 3, 10, 14], Distribution::Default, &device);

        assert_eq!(extractor.forward(x).dims(), [2, 32, 10, 14]);
    }

    #[test]
    fn test_extractors_do_not_share_weights() {
        let device = Default::default();
        let hazy = FeatureExtractor::<TestBackend>::new(&device, 3, 4);
        let dehazed = FeatureExtractor::<TestBackend>::new(&device, 3, 4);
        let x = Tensor::<TestBackend, 4>::random([1, 3, 6, 6], Distribution::Default, &device);

        let a = hazy.forward(x.clone()).into_data().to_vec::<f32>().unwrap();
        let b = dehazed.forward(x).into_data().to_vec::<f32>().unwrap();

        assert_ne!(a, b);
    }
}
