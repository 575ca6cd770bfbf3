pub mod data;
pub mod model;
pub mod training;

// Re-exports for convenience
pub use data::{add_haze, DataConfig, HazeAugmentation, HazyDataLoader, HazyImageFolder};
pub use model::{
    blend_features, compute_hr_loss, compute_total_loss, recover_image, BackboneClassifier,
    DehazeFusionNet, DehazeModule, FeatureExtractor, HazeAwareFusion, ModelConfig,
};
pub use training::{DataPhase, Trainer, TrainingConfig, TrainingModel};
