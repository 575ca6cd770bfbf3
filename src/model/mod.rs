pub mod backbone;
pub mod blocks;
pub mod classifier;
pub mod config;
pub mod dehaze;
pub mod extractor;
pub mod fusion;
pub mod loss;
pub mod net;
pub mod probe;

pub use backbone::MobileNetV3Backbone;
pub use classifier::BackboneClassifier;
pub use config::ModelConfig;
pub use dehaze::{recover_image, DehazeModule};
pub use extractor::FeatureExtractor;
pub use fusion::{blend_features, HazeAwareFusion};
pub use loss::{compute_hr_loss, compute_total_loss, DEFAULT_ALPHA};
pub use net::{DehazeFusionNet, FusionOutput};
pub use probe::ClassificationProbe;
