use burn::prelude::*;

/// Weight of the haze-robustness term in the total loss.
pub const DEFAULT_ALPHA: f32 = 0.1;

/// Lower clip applied to pooled statistics before taking logs.
const KL_EPSILON: f32 = 1e-7;

/// Global average pool `[B, C, H, W] -> [B, C]`.
pub fn global_average_pool<B: Backend>(features: Tensor<B, 4>) -> Tensor<B, 2> {
    let [batch, channels, _, _] = features.dims();
    features.mean_dim(3).mean_dim(2).reshape([batch, channels])
}

/// Batch-mean KL divergence `sum(p * ln(p / q))` between `[B, C]` rows.
///
/// Both sides are clipped to `[1e-7, 1]` first.
pub fn kl_divergence<B: Backend>(p: Tensor<B, 2>, q: Tensor<B, 2>) -> Tensor<B, 1> {
    let p = p.clamp(KL_EPSILON, 1.0);
    let q = q.clamp(KL_EPSILON, 1.0);

    let per_sample = (p.clone() * (p / q).log()).sum_dim(1);
    per_sample.mean()
}

/// Haze-robustness loss between hazy and dehazed feature maps.
pub fn compute_hr_loss<B: Backend>(hazy: Tensor<B, 4>, dehazed: Tensor<B, 4>) -> Tensor<B, 1> {
    let p = global_average_pool(hazy);
    let q = global_average_pool(dehazed);

    log::debug!("compute_hr_loss: pooled {:?}", p.dims());

    kl_divergence(p, q)
}

/// `L_total = L_det + alpha * L_hr`.
pub fn compute_total_loss<B: Backend>(
    detection_loss: Tensor<B, 1>,
    hazy: Tensor<B, 4>,
    dehazed: Tensor<B, 4>,
    alpha: f32,
) -> Tensor<B, 1> {
    detection_loss + compute_hr_loss(hazy, dehazed) * alpha
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, TensorData};

    type TestBackend = NdArray;

    #[test]
    fn test_hr_loss_of_identical_features_is_zero() {
        let device = Default::default();
        let fh = Tensor::<TestBackend, 4>::random([3, 8, 6, 6], Distribution::Uniform(0.0, 1.0), &device);

        let loss = compute_hr_loss(fh.clone(), fh).into_scalar().elem::<f32>();

        assert_eq!(loss, 0.0);
    }

    #[test]
    fn test_hr_loss_is_positive_for_different_features() {
        let device = Default::default();
        let fh = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(vec![0.8f32, 0.2], [1, 2, 1, 1]),
            &device,
        );
        let fdeh = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(vec![0.5f32, 0.5], [1, 2, 1, 1]),
            &device,
        );

        let loss = compute_hr_loss(fh, fdeh).into_scalar().elem::<f32>();
        let expected = 0.8 * (0.8f32 / 0.5).ln() + 0.2 * (0.2f32 / 0.5).ln();

        assert!((loss - expected).abs() < 1e-5, "{loss} vs {expected}");
    }

    #[test]
    fn test_total_loss_adds_weighted_term() {
        let device = Default::default();
        let fh = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(vec![0.8f32, 0.2], [1, 2, 1, 1]),
            &device,
        );
        let fdeh = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(vec![0.5f32, 0.5], [1, 2, 1, 1]),
            &device,
        );
        let det = Tensor::<TestBackend, 1>::from_floats([2.0], &device);

        let hr = compute_hr_loss(fh.clone(), fdeh.clone()).into_scalar().elem::<f32>();
        let total = compute_total_loss(det, fh, fdeh, DEFAULT_ALPHA)
            .into_scalar()
            .elem::<f32>();

        assert!((total - (2.0 + DEFAULT_ALPHA * hr)).abs() < 1e-6);
    }

    #[test]
    fn test_negative_statistics_are_clipped() {
        let device = Default::default();
        let fh = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(vec![-1.0f32, -2.0], [1, 2, 1, 1]),
            &device,
        );
        let fdeh = Tensor::<TestBackend, 4>::from_data(
            TensorData::new(vec![-3.0f32, -0.5], [1, 2, 1, 1]),
            &device,
        );

        let loss = compute_hr_loss(fh, fdeh).into_scalar().elem::<f32>();

        assert!(loss.is_finite());
        assert!(loss.abs() < 1e-6);
    }
}
