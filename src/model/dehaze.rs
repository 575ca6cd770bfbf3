use burn::nn::conv::Conv2d;
use burn::prelude::*;
use burn::tensor::activation::sigmoid;

use super::blocks::{same_conv, ConvRelu};
use super::config::ModelConfig;

/// Inverts the atmospheric scattering model with a learned map:
/// `dehazed = omega * hazy - omega + 1`.
///
/// The result is not clamped and may leave [0, 1].
pub fn recover_image<B: Backend>(omega: Tensor<B, 4>, hazy: Tensor<B, 4>) -> Tensor<B, 4> {
    omega.clone() * hazy - omega + 1.0
}

/// Two stacked 3x3 conv+ReLU layers with the given dilation rates.
#[derive(Module, Debug)]
pub struct DilatedBranch<B: Backend> {
    first: ConvRelu<B>,
    second: ConvRelu<B>,
}

impl<B: Backend> DilatedBranch<B> {
    pub fn new(device: &B::Device, filters: usize, dilations: [usize; 2]) -> Self {
        Self {
            first: ConvRelu::new(device, filters, filters, 3, dilations[0]),
            second: ConvRelu::new(device, filters, filters, 3, dilations[1]),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.second.forward(self.first.forward(x))
    }
}

/// Multi-branch dilated-convolution dehazer.
///
/// `[B, C, H, W]` hazy input -> `[B, C, H, W]` dehazed output.
#[derive(Module, Debug)]
pub struct DehazeModule<B: Backend> {
    stem1: ConvRelu<B>,
    stem2: ConvRelu<B>,
    branches: Vec<DilatedBranch<B>>,
    merge: ConvRelu<B>,
    squeeze: ConvRelu<B>,
    omega: Conv2d<B>,
}

impl<B: Backend> DehazeModule<B> {
    /// Dilation rates of the three parallel branches.
    pub const BRANCH_DILATIONS: [[usize; 2]; 3] = [[1, 1], [1, 2], [2, 2]];

    pub fn new(device: &B::Device, config: &ModelConfig) -> Self {
        let filters = config.filters;
        let channels = config.input_channels;

        let branches = Self::BRANCH_DILATIONS
            .iter()
            .map(|&dilations| DilatedBranch::new(device, filters, dilations))
            .collect::<Vec<_>>();

        log::info!(
            "DehazeModule: {} filters, {} dilated branches",
            filters,
            branches.len()
        );

        Self {
            stem1: ConvRelu::new(device, channels, filters, 3, 1),
            stem2: ConvRelu::new(device, filters, filters, 3, 1),
            merge: ConvRelu::new(device, filters * branches.len(), filters, 3, 1),
            squeeze: ConvRelu::new(device, filters, filters, 1, 1),
            omega: same_conv(device, filters, channels, 1, 1),
            branches,
        }
    }

    /// Predicts the per-pixel map omega in [0, 1].
    pub fn omega(&self, hazy: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.stem1.forward(hazy);
        let x = self.stem2.forward(x);

        let outputs = self
            .branches
            .iter()
            .map(|branch| branch.forward(x.clone()))
            .collect::<Vec<_>>();
        let x = Tensor::cat(outputs, 1);

        let x = self.merge.forward(x);
        let x = self.squeeze.forward(x);
        sigmoid(self.omega.forward(x))
    }

    /// Returns the dehazed image together with the omega map that produced it.
    pub fn forward_with_map(&self, hazy: Tensor<B, 4>) -> (Tensor<B, 4>, Tensor<B, 4>) {
        let omega = self.omega(hazy.clone());
        let dehazed = recover_image(omega.clone(), hazy);
        (dehazed, omega)
    }

    pub fn forward(&self, hazy: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward_with_map(hazy).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, TensorData};

    type TestBackend = NdArray;

    fn small_config() -> ModelConfig {
        ModelConfig {
            filters: 8,
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_output_shape_matches_input() {
        let device = Default::default();
        let module = DehazeModule::<TestBackend>::new(&device, &small_config());
        let hazy =
            Tensor::<TestBackend, 4>::random([2, 3, 24, 20], Distribution::Uniform(0.0, 1.0), &device);

        let (dehazed, omega) = module.forward_with_map(hazy);

        assert_eq!(dehazed.dims(), [2, 3, 24, 20]);
        assert_eq!(omega.dims(), [2, 3, 24, 20]);
    }

    #[test]
    fn test_omega_is_bounded() {
        let device = Default::default();
        let module = DehazeModule::<TestBackend>::new(&device, &small_config());
        let hazy =
            Tensor::<TestBackend, 4>::random([1, 3, 16, 16], Distribution::Uniform(0.0, 1.0), &device);

        let omega = module.omega(hazy).into_data().to_vec::<f32>().unwrap();

        assert!(omega.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_recover_image_formula() {
        let device = Default::default();
        let omega = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(vec![0.0f32, 0.5, 1.0, 0.25], [1, 1, 2, 2]),
            &device,
        );
        let hazy = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(vec![0.3f32, 0.4, 0.7, 1.0], [1, 1, 2, 2]),
            &device,
        );

        let out = recover_image(omega, hazy).into_data().to_vec::<f32>().unwrap();
        let expected = [1.0f32, 0.7, 0.7, 1.0];

        for (got, want) in out.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
        }
    }
}
