use anyhow::Result;
use burn::prelude::*;
use burn::tensor::TensorData;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::dataset::{HazyImageFolder, IMAGE_CHANNELS};

/// Decoded batch, still on the host.
#[derive(Debug, Clone)]
pub struct RawBatch {
    /// `[batch, 3, size, size]` row-major.
    pub pixels: Vec<f32>,
    pub labels: Vec<usize>,
    pub image_size: usize,
}

impl RawBatch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Images `[B, 3, H, W]` and class indices `[B]` on `device`.
    pub fn to_tensors<B: Backend>(&self, device: &B::Device) -> (Tensor<B, 4>, Tensor<B, 1, Int>) {
        let batch = self.len();
        let size = self.image_size;

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(self.pixels.clone(), [batch, IMAGE_CHANNELS, size, size]),
            device,
        );
        let labels = Tensor::<B, 1, Int>::from_data(
            TensorData::new(
                self.labels.iter().map(|&l| l as i64).collect::<Vec<_>>(),
                [batch],
            ),
            device,
        );

        (images, labels)
    }
}

/// Iterates a folder in batches, decoding images on demand.
pub struct HazyDataLoader {
    dataset: HazyImageFolder,
    batch_size: usize,
    indices: Vec<usize>,
    current_idx: usize,
}

impl HazyDataLoader {
    /// `rng` is `Some` to shuffle the sample order.
    pub fn new(dataset: HazyImageFolder, batch_size: usize, rng: Option<&mut StdRng>) -> Self {
        let mut indices: Vec<usize> = (0..dataset.len()).collect();

        if let Some(rng) = rng {
            indices.shuffle(rng);
        }

        Self {
            dataset,
            batch_size: batch_size.max(1),
            indices,
            current_idx: 0,
        }
    }

    /// Shuffled loader seeded from `seed`, or from entropy when absent.
    pub fn shuffled(dataset: HazyImageFolder, batch_size: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(dataset, batch_size, Some(&mut rng))
    }

    pub fn len(&self) -> usize {
        (self.dataset.len() + self.batch_size - 1) / self.batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }
}

impl Iterator for HazyDataLoader {
    type Item = Result<RawBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_idx >= self.indices.len() {
            return None;
        }

        let end_idx = (self.current_idx + self.batch_size).min(self.indices.len());
        let batch_indices = &self.indices[self.current_idx..end_idx];
        self.current_idx = end_idx;

        let size = self.dataset.image_size();
        let mut pixels = Vec::with_capacity(batch_indices.len() * 3 * size * size);
        let mut labels = Vec::with_capacity(batch_indices.len());

        for &idx in batch_indices {
            match self.dataset.load(idx) {
                Ok((image, label)) => {
                    pixels.extend(image);
                    labels.push(label);
                }
                Err(e) => {
                    // A bad file ends the pass.
                    self.current_idx = self.indices.len();
                    return Some(Err(e));
                }
            }
        }

        Some(Ok(RawBatch {
            pixels,
            labels,
            image_size: size,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::DataConfig;
    use burn::backend::NdArray;
    use image::RgbImage;

    type TestBackend = NdArray;

    fn folder(count: usize) -> (tempfile::TempDir, HazyImageFolder) {
        let dir = tempfile::tempdir().unwrap();
        let class_dir = dir.path().join("haze");
        std::fs::create_dir_all(&class_dir).unwrap();
        for i in 0..count {
            RgbImage::from_pixel(6, 6, image::Rgb([i as u8, 0, 0]))
                .save(class_dir.join(format!("{i}.png")))
                .unwrap();
        }
        let config = DataConfig {
            data_dir: dir.path().to_path_buf(),
            image_size: 4,
            batch_size: 2,
            validation_split: 0.0,
            shuffle_seed: Some(7),
        };
        let (train, _) = HazyImageFolder::split(&config).unwrap();
        (dir, train)
    }

    #[test]
    fn test_batches_cover_every_sample() {
        let (_dir, train) = folder(5);
        let loader = HazyDataLoader::shuffled(train, 2, Some(7));
        assert_eq!(loader.len(), 3);

        let sizes: Vec<usize> = loader.map(|b| b.unwrap().len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_same_seed_same_order() {
        let (_dir, train) = folder(6);
        let a: Vec<Vec<f32>> = HazyDataLoader::shuffled(train.clone(), 3, Some(1))
            .map(|b| b.unwrap().pixels)
            .collect();
        let b: Vec<Vec<f32>> = HazyDataLoader::shuffled(train, 3, Some(1))
            .map(|b| b.unwrap().pixels)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_to_tensors_shapes() {
        let (_dir, train) = folder(3);
        let device = Default::default();
        let mut loader = HazyDataLoader::new(train, 3, None);

        let batch = loader.next().unwrap().unwrap();
        let (images, labels) = batch.to_tensors::<TestBackend>(&device);

        assert_eq!(images.dims(), [3, 3, 4, 4]);
        assert_eq!(labels.dims(), [3]);
        assert!(loader.next().is_none());
    }

    #[test]
    fn test_corrupt_image_stops_the_pass() {
        let (dir, train) = folder(2);
        std::fs::write(dir.path().join("haze").join("0.png"), b"garbage").unwrap();

        let mut loader = HazyDataLoader::new(train, 1, None);
        assert!(loader.next().unwrap().is_err());
        assert!(loader.next().is_none());
    }
}
