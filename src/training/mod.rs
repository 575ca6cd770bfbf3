pub mod checkpoint;
pub mod config;
pub mod model;
pub mod trainer;

pub use checkpoint::{load_model, save_model, ModelCard};
pub use config::TrainingConfig;
pub use model::TrainingModel;
pub use trainer::{DataPhase, EpochReport, LossTracker, Trainer};
