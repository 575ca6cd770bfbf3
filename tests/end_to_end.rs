use burn::backend::{Autodiff, NdArray};
use burn::prelude::*;
use burn::tensor::Distribution;
use image::RgbImage;

use haze_fusion::data::{DataConfig, HazyImageFolder};
use haze_fusion::model::{DehazeFusionNet, ModelConfig};
use haze_fusion::training::{load_model, DataPhase, Trainer, TrainingConfig};

type TestBackend = NdArray;
type TestAutodiffBackend = Autodiff<TestBackend>;

fn hazy_batch(batch: usize, size: usize) -> Tensor<TestBackend, 4> {
    Tensor::random(
        [batch, 3, size, size],
        Distribution::Uniform(0.0, 1.0),
        &Default::default(),
    )
}

#[test]
fn fused_features_for_a_batch_of_eight() {
    let device = Default::default();
    let net = DehazeFusionNet::<TestBackend>::new(&device, &ModelConfig::default()).unwrap();

    let out = net.forward_all(hazy_batch(8, 32));

    assert_eq!(out.dehazed.dims(), [8, 3, 32, 32]);
    assert_eq!(out.fused.dims(), [8, 32, 32, 32]);
}

#[test]
#[ignore = "full 256x256 resolution is slow on the CPU backend"]
fn fused_features_at_full_resolution() {
    let device = Default::default();
    let net = DehazeFusionNet::<TestBackend>::new(&device, &ModelConfig::default()).unwrap();

    let fused = net.forward(hazy_batch(8, 256));

    assert_eq!(fused.dims(), [8, 32, 256, 256]);
}

fn write_dataset(root: &std::path::Path) {
    for (class, tint) in [("dense", 200u8), ("light", 60u8)] {
        let dir = root.join(class);
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..5u8 {
            let img = RgbImage::from_fn(20, 20, |x, y| {
                image::Rgb([tint, (x as u8) * 10 + i, (y as u8) * 10])
            });
            img.save(dir.join(format!("{i}.png"))).unwrap();
        }
    }
}

#[test]
fn training_alternates_phases_and_saves_a_reloadable_model() {
    let data_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    write_dataset(data_dir.path());

    let config = TrainingConfig {
        model: ModelConfig {
            filters: 4,
            feature_channels: 8,
            reduction_ratio: 4,
            ..ModelConfig::default()
        },
        data: DataConfig {
            data_dir: data_dir.path().to_path_buf(),
            image_size: 16,
            batch_size: 4,
            validation_split: 0.2,
            shuffle_seed: Some(3),
        },
        epochs: 2,
        save_dir: out_dir.path().to_path_buf(),
        ..TrainingConfig::default()
    };

    let (train, validation) = HazyImageFolder::split(&config.data).unwrap();
    assert_eq!(train.len(), 8);
    assert_eq!(validation.len(), 2);

    let device = Default::default();
    let mut trainer =
        Trainer::<TestAutodiffBackend>::new(config, train.class_names().to_vec(), device).unwrap();
    let reports = trainer.fit(&train, &validation).unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].phase, DataPhase::Original);
    assert_eq!(reports[1].phase, DataPhase::Rehazed);
    for report in &reports {
        assert_eq!(report.batches + report.skipped_batches, 2);
        assert_eq!(report.skipped_val_batches, 0);
        assert!(report.train_loss.is_finite());
        assert!(report.val_loss.map(f32::is_finite).unwrap_or(false));
    }

    let dir = trainer.save_model("final", 16).unwrap();
    let (model, card) = load_model::<TestBackend>(&dir, &Default::default()).unwrap();
    assert_eq!(card.class_names, vec!["dense".to_string(), "light".to_string()]);
    assert_eq!(model.net.forward(hazy_batch(1, 16)).dims(), [1, 8, 16, 16]);
}

#[test]
fn trainer_rejects_grayscale_model_config() {
    let config = TrainingConfig {
        model: ModelConfig {
            input_channels: 1,
            ..ModelConfig::default()
        },
        ..TrainingConfig::default()
    };

    let result = Trainer::<TestAutodiffBackend>::new(config, vec!["fog".to_string()], Default::default());
    assert!(result.is_err());
}

#[test]
fn training_fails_on_missing_data_directory() {
    let config = DataConfig {
        data_dir: "no/such/hazy/images".into(),
        ..DataConfig::default()
    };
    assert!(HazyImageFolder::split(&config).is_err());
}
