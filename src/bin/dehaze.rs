use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::NdArray;
use burn::prelude::*;
use burn::tensor::TensorData;
use clap::Parser;
use image::imageops::FilterType;

use haze_fusion::data::{chw_to_image, image_to_chw, IMAGE_CHANNELS};
use haze_fusion::training::load_model;

#[derive(Parser, Debug)]
#[command(author, version, about = "Dehaze an image with a trained model")]
struct Args {
    /// Path to the hazy input image
    #[arg(short, long)]
    image: PathBuf,

    /// Model directory written by the trainer (e.g. runs/haze_fusion/final)
    #[arg(short, long, default_value = "runs/haze_fusion/final")]
    weights: PathBuf,

    /// Where to write the dehazed PNG
    #[arg(short, long, default_value = "dehazed.png")]
    output: PathBuf,

    /// Resize to the training resolution instead of keeping the input size
    #[arg(long)]
    resize: bool,
}

type MyBackend = NdArray;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let device = NdArrayDevice::default();

    let (model, card) = load_model::<MyBackend>(&args.weights, &device)?;
    anyhow::ensure!(
        card.model.input_channels == IMAGE_CHANNELS,
        "model expects {} input channels, images are decoded as RGB",
        card.model.input_channels
    );
    log::info!(
        "Loaded '{}' ({} filters, trained at {}x{})",
        card.checkpoint_name,
        card.model.filters,
        card.image_size,
        card.image_size
    );

    let img = image::open(&args.image)
        .with_context(|| format!("failed to open {}", args.image.display()))?;
    let img = if args.resize {
        img.resize_exact(card.image_size as u32, card.image_size as u32, FilterType::Nearest)
    } else {
        img
    };
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let hazy = Tensor::<MyBackend, 4>::from_data(
        TensorData::new(
            image_to_chw(&rgb),
            [1, IMAGE_CHANNELS, height as usize, width as usize],
        ),
        &device,
    );

    let start = Instant::now();
    let dehazed = model.net.dehaze.forward(hazy);
    log::info!("Dehazed {}x{} in {:.2}ms", width, height, start.elapsed().as_secs_f64() * 1e3);

    let pixels = dehazed.into_data().convert::<f32>().to_vec::<f32>().map_err(|e| {
        anyhow::anyhow!("failed to read output tensor: {:?}", e)
    })?;
    chw_to_image(&pixels, width, height)?
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!("Saved dehazed image to {}", args.output.display());
    Ok(())
}
