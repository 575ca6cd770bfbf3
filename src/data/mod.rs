pub mod dataloader;
pub mod dataset;
pub mod prefetch;
pub mod transforms;

pub use dataloader::{HazyDataLoader, RawBatch};
pub use dataset::{
    chw_to_image, image_to_chw, load_image, DataConfig, HazyImageFolder, ImageSample,
    IMAGE_CHANNELS,
};
pub use prefetch::Prefetcher;
pub use transforms::{add_haze, add_haze_with_depth, HazeAugmentation};
