use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use burn::prelude::*;
use burn::record::{BinFileRecorder, FullPrecisionSettings, Recorder};
use serde::{Deserialize, Serialize};

use crate::model::ModelConfig;
use crate::training::model::TrainingModel;

const WEIGHTS_STEM: &str = "model";
const CARD_FILE: &str = "config.json";

/// Metadata stored next to saved weights, enough to rebuild the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCard {
    pub model_type: String,
    pub model: ModelConfig,
    pub class_names: Vec<String>,
    pub image_size: usize,
    pub checkpoint_name: String,
}

/// Writes `<dir>/model.bin` and `<dir>/config.json`.
pub fn save_model<B: Backend>(model: &TrainingModel<B>, card: &ModelCard, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .record(model.clone().into_record(), dir.join(WEIGHTS_STEM))
        .map_err(|e| anyhow!("failed to save model: {:?}", e))?;

    let card_path = dir.join(CARD_FILE);
    std::fs::write(&card_path, serde_json::to_string_pretty(card)?)
        .with_context(|| format!("failed to write {}", card_path.display()))?;

    log::info!("Saved model '{}' to {}", card.checkpoint_name, dir.display());
    Ok(())
}

pub fn load_card(dir: &Path) -> Result<ModelCard> {
    let card_path = dir.join(CARD_FILE);
    let content = std::fs::read_to_string(&card_path)
        .with_context(|| format!("failed to read {}", card_path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

/// Rebuilds a model from a directory written by `save_model`.
pub fn load_model<B: Backend>(dir: &Path, device: &B::Device) -> Result<(TrainingModel<B>, ModelCard)> {
    let card = load_card(dir)?;
    let model = TrainingModel::new(device, &card.model, card.class_names.len())?;

    let weights: PathBuf = dir.join(WEIGHTS_STEM);
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    let record = recorder
        .load(weights, device)
        .map_err(|e| anyhow!("failed to load weights from {}: {:?}", dir.display(), e))?;

    Ok((model.load_record(record), card))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    #[test]
    fn test_saved_model_reloads_identically() {
        let device = Default::default();
        let config = ModelConfig {
            filters: 4,
            feature_channels: 8,
            reduction_ratio: 4,
            ..ModelConfig::default()
        };
        let model = TrainingModel::<TestBackend>::new(&device, &config, 2).unwrap();
        let card = ModelCard {
            model_type: "DehazeFusionNet".to_string(),
            model: config,
            class_names: vec!["a".to_string(), "b".to_string()],
            image_size: 8,
            checkpoint_name: "final".to_string(),
        };

        let dir = tempfile::tempdir().unwrap();
        save_model(&model, &card, dir.path()).unwrap();

        let (loaded, loaded_card) = load_model::<TestBackend>(dir.path(), &device).unwrap();
        assert_eq!(loaded_card, card);

        let x = Tensor::<TestBackend, 4>::random([1, 3, 8, 8], Distribution::Default, &device);
        let a = model.net.dehaze.forward(x.clone()).into_data().to_vec::<f32>().unwrap();
        let b = loaded.net.dehaze.forward(x).into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_card_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_model::<TestBackend>(dir.path(), &Default::default()).is_err());
    }
}
