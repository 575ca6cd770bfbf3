use std::path::PathBuf;
use std::time::Instant;

use anyhow::{ensure, Result};
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use indicatif::{ProgressBar, ProgressStyle};

use crate::data::{HazeAugmentation, HazyDataLoader, HazyImageFolder, Prefetcher, RawBatch};
use crate::training::checkpoint::{save_model, ModelCard};
use crate::training::model::TrainingModel;
use crate::training::TrainingConfig;

/// Which version of the data an epoch trains on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPhase {
    /// Images as loaded from disk.
    Original,
    /// The same images passed through synthetic haze.
    Rehazed,
}

impl DataPhase {
    /// Even epochs (0-based) use the original data, odd epochs re-hazed data.
    pub fn for_epoch(epoch: usize) -> Self {
        if epoch % 2 == 0 {
            DataPhase::Original
        } else {
            DataPhase::Rehazed
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            DataPhase::Original => "original hazy dataset",
            DataPhase::Rehazed => "refined hazy dataset",
        }
    }

    /// The images this phase trains on.
    pub fn prepare_images<B: Backend>(
        self,
        images: Tensor<B, 4>,
        haze: &HazeAugmentation,
    ) -> Tensor<B, 4> {
        match self {
            DataPhase::Original => images,
            DataPhase::Rehazed => haze.apply(images),
        }
    }
}

/// Running mean over finite batch losses.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LossTracker {
    total: f32,
    count: usize,
    skipped: usize,
}

impl LossTracker {
    /// Adds `loss` when finite; returns `false` for a skipped batch.
    pub fn record(&mut self, loss: f32) -> bool {
        if loss.is_finite() {
            self.total += loss;
            self.count += 1;
            true
        } else {
            self.skipped += 1;
            false
        }
    }

    pub fn mean(&self) -> Option<f32> {
        (self.count > 0).then(|| self.total / self.count as f32)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub phase: DataPhase,
    pub train_loss: f32,
    pub val_loss: Option<f32>,
    pub batches: usize,
    pub skipped_batches: usize,
    pub skipped_val_batches: usize,
}

pub struct Trainer<B: AutodiffBackend> {
    pub model: TrainingModel<B>,
    optimizer: OptimizerAdaptor<Adam, TrainingModel<B>, B>,
    config: TrainingConfig,
    class_names: Vec<String>,
    haze: HazeAugmentation,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(config: TrainingConfig, class_names: Vec<String>, device: B::Device) -> Result<Self> {
        config.validate()?;
        ensure!(!class_names.is_empty(), "at least one class is required");

        let model = TrainingModel::new(&device, &config.model, class_names.len())?;
        let optimizer = AdamConfig::new().with_epsilon(1e-7).init();
        let haze = HazeAugmentation::new(config.beta, config.airlight);

        Ok(Self {
            model,
            optimizer,
            config,
            class_names,
            haze,
            device,
        })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Runs every epoch, alternating original and re-hazed data.
    ///
    /// Any data or I/O error aborts the run.
    pub fn fit(
        &mut self,
        train: &HazyImageFolder,
        validation: &HazyImageFolder,
    ) -> Result<Vec<EpochReport>> {
        let epochs = self.config.epochs;
        let mut reports = Vec::with_capacity(epochs);

        log::info!(
            "Training for {} epochs on {} images ({} validation)",
            epochs,
            train.len(),
            validation.len()
        );

        for epoch in 0..epochs {
            let epoch_start = Instant::now();
            let phase = DataPhase::for_epoch(epoch);
            log::info!("Epoch {}/{}: training on {}", epoch + 1, epochs, phase.describe());

            let train_stats = self.train_epoch(train, phase, epoch)?;
            let train_loss = train_stats.mean().unwrap_or(0.0);
            let val_stats = self.validate(validation)?;
            let val_loss = val_stats.mean();

            match val_loss {
                Some(val_loss) => log::info!(
                    "Epoch {}/{} done in {:.1}s: train={:.4} val={:.4}",
                    epoch + 1,
                    epochs,
                    epoch_start.elapsed().as_secs_f32(),
                    train_loss,
                    val_loss
                ),
                None => log::info!(
                    "Epoch {}/{} done in {:.1}s: train={:.4}",
                    epoch + 1,
                    epochs,
                    epoch_start.elapsed().as_secs_f32(),
                    train_loss
                ),
            }

            reports.push(EpochReport {
                epoch,
                phase,
                train_loss,
                val_loss,
                batches: train_stats.count(),
                skipped_batches: train_stats.skipped(),
                skipped_val_batches: val_stats.skipped(),
            });
        }

        Ok(reports)
    }

    fn train_epoch(
        &mut self,
        dataset: &HazyImageFolder,
        phase: DataPhase,
        epoch: usize,
    ) -> Result<LossTracker> {
        let seed = self
            .config
            .data
            .shuffle_seed
            .map(|seed| seed.wrapping_add(epoch as u64));
        let loader = HazyDataLoader::shuffled(dataset.clone(), self.config.data.batch_size, seed);

        let progress = ProgressBar::new(loader.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?,
        );

        let batches = Prefetcher::spawn(loader, self.config.prefetch_depth);

        let mut tracker = LossTracker::default();

        for (batch_idx, batch) in batches.enumerate() {
            let batch = batch?;
            progress.inc(1);

            match self.train_step(&batch, phase) {
                Some(loss_value) => {
                    tracker.record(loss_value);
                    progress.set_message(format!("loss={:.4}", loss_value));
                    log::debug!("batch {}: loss={:.4}", batch_idx + 1, loss_value);
                }
                None => {
                    log::warn!("Non-finite loss at batch {}, skipping step", batch_idx + 1);
                    tracker.record(f32::NAN);
                }
            }
        }

        progress.finish_and_clear();
        Ok(tracker)
    }

    /// One optimizer step; `None` when the loss is not finite.
    pub fn train_step(&mut self, batch: &RawBatch, phase: DataPhase) -> Option<f32> {
        let (images, labels) = batch.to_tensors::<B>(&self.device);
        let images = phase.prepare_images(images, &self.haze);

        let loss = self.model.loss(images, labels, self.config.alpha);
        let loss_value = loss.clone().into_scalar().elem::<f32>();

        if !loss_value.is_finite() {
            return None;
        }

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self
            .optimizer
            .step(self.config.learning_rate, self.model.clone(), grads);

        Some(loss_value)
    }

    /// Total loss over the validation split; the mean is `None` when it is empty.
    pub fn validate(&self, dataset: &HazyImageFolder) -> Result<LossTracker> {
        let mut tracker = LossTracker::default();
        if dataset.is_empty() {
            return Ok(tracker);
        }

        let model = self.model.valid();
        let loader = HazyDataLoader::new(dataset.clone(), self.config.data.batch_size, None);

        for (batch_idx, batch) in Prefetcher::spawn(loader, self.config.prefetch_depth).enumerate() {
            let (images, labels) = batch?.to_tensors::<B::InnerBackend>(&self.device);
            let loss = model
                .loss(images, labels, self.config.alpha)
                .into_scalar()
                .elem::<f32>();

            if !tracker.record(loss) {
                log::warn!("Non-finite validation loss at batch {}, skipping", batch_idx + 1);
            }
        }

        Ok(tracker)
    }

    /// Saves the current weights under `<save_dir>/<name>`.
    pub fn save_model(&self, name: &str, image_size: usize) -> Result<PathBuf> {
        let dir = self.config.save_dir.join(name);
        let card = ModelCard {
            model_type: "DehazeFusionNet".to_string(),
            model: self.config.model.clone(),
            class_names: self.class_names.clone(),
            image_size,
            checkpoint_name: name.to_string(),
        };

        save_model(&self.model, &card, &dir)?;
        Ok(dir)
    }
}
