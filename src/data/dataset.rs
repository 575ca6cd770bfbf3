use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use image::imageops::FilterType;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "ppm", "tif", "tiff"];

/// Every image is decoded as RGB.
pub const IMAGE_CHANNELS: usize = 3;

/// Where and how hazy images are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    pub image_size: usize,
    pub batch_size: usize,
    /// Fraction of every class held out for validation.
    pub validation_split: f32,
    /// Seed for batch shuffling; `None` draws from the OS.
    pub shuffle_seed: Option<u64>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/hazy_images"),
            image_size: 256,
            batch_size: 8,
            validation_split: 0.2,
            shuffle_seed: None,
        }
    }
}

impl DataConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.image_size > 0, "image_size must be positive");
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(
            (0.0..1.0).contains(&self.validation_split),
            "validation_split must be in [0, 1), got {}",
            self.validation_split
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageSample {
    pub path: PathBuf,
    pub label: usize,
}

/// Images organised as `root/<class>/<image>`, one split of it.
#[derive(Debug, Clone)]
pub struct HazyImageFolder {
    samples: Vec<ImageSample>,
    class_names: Vec<String>,
    image_size: usize,
}

impl HazyImageFolder {
    /// Scans `config.data_dir` and returns the (training, validation) splits.
    ///
    /// Classes are the sorted subdirectory names. Within each class the files
    /// are sorted and the leading `validation_split` fraction is held out.
    pub fn split(config: &DataConfig) -> Result<(Self, Self)> {
        config.validate()?;

        let root = config.data_dir.as_path();
        if !root.is_dir() {
            bail!("data directory not found: {}", root.display());
        }

        let class_names = discover_classes(root)?;
        if class_names.is_empty() {
            bail!("no class subdirectories in {}", root.display());
        }

        let mut train = Vec::new();
        let mut validation = Vec::new();

        for (label, class_name) in class_names.iter().enumerate() {
            let files = list_images(&root.join(class_name));
            let held_out = (config.validation_split * files.len() as f32) as usize;

            log::debug!(
                "class '{}': {} images, {} held out",
                class_name,
                files.len(),
                held_out
            );

            for (idx, path) in files.into_iter().enumerate() {
                let sample = ImageSample { path, label };
                if idx < held_out {
                    validation.push(sample);
                } else {
                    train.push(sample);
                }
            }
        }

        if train.is_empty() {
            bail!("no training images found under {}", root.display());
        }

        log::info!(
            "Found {} training and {} validation images in {} classes",
            train.len(),
            validation.len(),
            class_names.len()
        );

        Ok((
            Self {
                samples: train,
                class_names: class_names.clone(),
                image_size: config.image_size,
            },
            Self {
                samples: validation,
                class_names,
                image_size: config.image_size,
            },
        ))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[ImageSample] {
        &self.samples
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    pub fn image_size(&self) -> usize {
        self.image_size
    }

    /// Decodes sample `idx` into CHW floats in [0, 1].
    pub fn load(&self, idx: usize) -> Result<(Vec<f32>, usize)> {
        let sample = self.samples.get(idx).with_context(|| {
            format!(
                "index {} out of bounds, folder has {} samples",
                idx,
                self.samples.len()
            )
        })?;

        let pixels = load_image(&sample.path, self.image_size)?;
        Ok((pixels, sample.label))
    }
}

fn discover_classes(root: &Path) -> Result<Vec<String>> {
    let mut classes = Vec::new();
    for entry in std::fs::read_dir(root)
        .with_context(|| format!("failed to read {}", root.display()))?
    {
        let entry = entry?;
        if entry.path().is_dir() {
            classes.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    classes.sort();
    Ok(classes)
}

fn list_images(class_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(class_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect();
    files.sort();
    files
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Loads an image, resizes it to `size x size` (nearest) and rescales by 1/255.
pub fn load_image(path: &Path, size: usize) -> Result<Vec<f32>> {
    let img = image::open(path).with_context(|| format!("failed to decode {}", path.display()))?;
    let img = img.resize_exact(size as u32, size as u32, FilterType::Nearest);
    Ok(image_to_chw(&img.to_rgb8()))
}

/// RGB image -> channel-first floats in [0, 1].
pub fn image_to_chw(img: &RgbImage) -> Vec<f32> {
    let (w, h) = img.dimensions();
    let plane = (w * h) as usize;
    let mut pixels = vec![0.0f32; plane * IMAGE_CHANNELS];

    for (idx, pixel) in img.pixels().enumerate() {
        for c in 0..IMAGE_CHANNELS {
            pixels[c * plane + idx] = pixel[c] as f32 / 255.0;
        }
    }

    pixels
}

/// Channel-first floats -> RGB image, values clamped to [0, 1] before scaling.
pub fn chw_to_image(pixels: &[f32], width: u32, height: u32) -> Result<RgbImage> {
    let plane = (width * height) as usize;
    ensure!(
        pixels.len() == plane * 3,
        "expected {} values for a {}x{} image, got {}",
        plane * 3,
        width,
        height,
        pixels.len()
    );

    Ok(RgbImage::from_fn(width, height, |x, y| {
        let idx = (y * width + x) as usize;
        let channel = |c: usize| (pixels[c * plane + idx].clamp(0.0, 1.0) * 255.0).round() as u8;
        image::Rgb([channel(0), channel(1), channel(2)])
    }))
}
