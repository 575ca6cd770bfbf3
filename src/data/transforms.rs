use burn::prelude::*;
use burn::tensor::Distribution;

/// Scattering coefficient used for re-hazing.
pub const DEFAULT_BETA: f32 = 0.1;
/// Global atmospheric light of the synthetic haze.
pub const DEFAULT_AIRLIGHT: f32 = 0.5;
/// Range the random depth map is sampled from.
pub const DEPTH_RANGE: (f64, f64) = (0.5, 2.0);

/// Forward scattering model `I = J * t + A * (1 - t)` with `t = exp(-beta * depth)`.
pub fn add_haze_with_depth<B: Backend, const D: usize>(
    images: Tensor<B, D>,
    depth: Tensor<B, D>,
    beta: f32,
    airlight: f32,
) -> Tensor<B, D> {
    let transmission = (depth * (-beta)).exp();
    let veil = (transmission.clone().neg() + 1.0) * airlight;
    images * transmission + veil
}

/// Re-hazes a batch with a random depth drawn per element from [0.5, 2.0]
/// and airlight 0.5.
pub fn add_haze<B: Backend, const D: usize>(images: Tensor<B, D>, beta: f32) -> Tensor<B, D> {
    HazeAugmentation::new(beta, DEFAULT_AIRLIGHT).apply(images)
}

/// Synthetic haze applied to odd-epoch batches.
#[derive(Debug, Clone, Copy)]
pub struct HazeAugmentation {
    pub beta: f32,
    pub airlight: f32,
}

impl Default for HazeAugmentation {
    fn default() -> Self {
        Self {
            beta: DEFAULT_BETA,
            airlight: DEFAULT_AIRLIGHT,
        }
    }
}

impl HazeAugmentation {
    pub fn new(beta: f32, airlight: f32) -> Self {
        Self { beta, airlight }
    }

    pub fn apply<B: Backend, const D: usize>(&self, images: Tensor<B, D>) -> Tensor<B, D> {
        let depth = Tensor::random(
            images.shape(),
            Distribution::Uniform(DEPTH_RANGE.0, DEPTH_RANGE.1),
            &images.device(),
        );
        add_haze_with_depth(images, depth, self.beta, self.airlight)
    }
}
