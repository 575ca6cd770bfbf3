use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::transforms::{DEFAULT_AIRLIGHT, DEFAULT_BETA};
use crate::data::{DataConfig, IMAGE_CHANNELS};
use crate::model::{ModelConfig, DEFAULT_ALPHA};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub model: ModelConfig,
    pub data: DataConfig,

    // Training
    pub epochs: usize,
    pub learning_rate: f64,

    // Loss
    pub alpha: f32,

    // Re-hazing
    pub beta: f32,
    pub airlight: f32,

    /// Batches decoded ahead of the training step.
    pub prefetch_depth: usize,

    // Output
    pub save_dir: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            data: DataConfig::default(),
            epochs: 10,
            learning_rate: 1e-3,
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            airlight: DEFAULT_AIRLIGHT,
            prefetch_depth: 2,
            save_dir: PathBuf::from("runs/haze_fusion"),
        }
    }
}

impl TrainingConfig {
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: TrainingConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.data.validate()?;
        ensure!(
            self.model.input_channels == IMAGE_CHANNELS,
            "input_channels must be {} to match decoded RGB images, got {}",
            IMAGE_CHANNELS,
            self.model.input_channels
        );
        ensure!(self.learning_rate > 0.0, "learning_rate must be positive");
        ensure!(self.beta >= 0.0, "beta must not be negative");
        ensure!(
            (0.0..=1.0).contains(&self.airlight),
            "airlight must be in [0, 1]"
        );
        Ok(())
    }
}
