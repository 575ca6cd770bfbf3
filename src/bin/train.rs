use std::path::PathBuf;

use anyhow::Result;
use burn::backend::{Autodiff, NdArray};
use clap::Parser;

use haze_fusion::data::HazyImageFolder;
use haze_fusion::training::{Trainer, TrainingConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Train the dehazing + attention fusion network")]
struct Args {
    /// YAML training config, created with defaults when missing
    #[arg(short, long, default_value = "configs/train_config.yaml")]
    config: PathBuf,

    /// Overrides the image directory (class subdirectories)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Overrides the number of epochs
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Overrides the output directory
    #[arg(short, long)]
    save_dir: Option<PathBuf>,
}

type MyBackend = NdArray;
type MyAutodiffBackend = Autodiff<MyBackend>;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = if args.config.exists() {
        log::info!("Loading config from {}", args.config.display());
        TrainingConfig::from_yaml(&args.config)?
    } else {
        let config = TrainingConfig::default();
        config.save(&args.config)?;
        log::info!("Created default config at {}", args.config.display());
        config
    };

    if let Some(data_dir) = args.data_dir {
        config.data.data_dir = data_dir;
    }
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    if let Some(save_dir) = args.save_dir {
        config.save_dir = save_dir;
    }
    config.validate()?;

    println!("Training configuration:");
    println!("  Data dir:        {}", config.data.data_dir.display());
    println!("  Epochs:          {}", config.epochs);
    println!("  Batch size:      {}", config.data.batch_size);
    println!("  Image size:      {}x{}", config.data.image_size, config.data.image_size);
    println!("  Filters:         {}", config.model.filters);
    println!("  Reduction ratio: {}", config.model.reduction_ratio);
    println!("  Alpha / beta:    {} / {}", config.alpha, config.beta);
    println!("  Save dir:        {}", config.save_dir.display());
    println!();

    let (train, validation) = HazyImageFolder::split(&config.data)?;
    let image_size = config.data.image_size;

    let device = Default::default();
    let mut trainer =
        Trainer::<MyAutodiffBackend>::new(config, train.class_names().to_vec(), device)?;

    let reports = trainer.fit(&train, &validation)?;

    println!("{:<8} {:<10} {:<14} {:<14}", "Epoch", "Phase", "Train Loss", "Val Loss");
    for report in &reports {
        println!(
            "{:<8} {:<10} {:<14.6} {:<14}",
            report.epoch + 1,
            format!("{:?}", report.phase),
            report.train_loss,
            report
                .val_loss
                .map(|v| format!("{:.6}", v))
                .unwrap_or_else(|| "-".to_string())
        );
    }

    let dir = trainer.save_model("final", image_size)?;
    println!("\nModel saved in {}", dir.display());

    Ok(())
}
