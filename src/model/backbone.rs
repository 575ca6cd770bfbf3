use std::path::Path;

use anyhow::{anyhow, Result};
use burn::prelude::*;
use burn::record::{BinFileRecorder, FullPrecisionSettings, Recorder};

use super::blocks::{ConvBnAct, InvertedResidual, InvertedResidualSpec};

/// Channels produced by the final backbone convolution.
pub const BACKBONE_CHANNELS: usize = 960;

const RE: bool = false;
const HS: bool = true;

/// MobileNetV3-Large block table:
/// in, kernel, expanded, out, squeeze-excitation, hard-swish, stride.
pub const MOBILENET_V3_LARGE: [InvertedResidualSpec; 15] = [
    InvertedResidualSpec::new(16, 3, 16, 16, false, RE, 1),
    InvertedResidualSpec::new(16, 3, 64, 24, false, RE, 2),
    InvertedResidualSpec::new(24, 3, 72, 24, false, RE, 1),
    InvertedResidualSpec::new(24, 5, 72, 40, true, RE, 2),
    InvertedResidualSpec::new(40, 5, 120, 40, true, RE, 1),
    InvertedResidualSpec::new(40, 5, 120, 40, true, RE, 1),
    InvertedResidualSpec::new(40, 3, 240, 80, false, HS, 2),
    InvertedResidualSpec::new(80, 3, 200, 80, false, HS, 1),
    InvertedResidualSpec::new(80, 3, 184, 80, false, HS, 1),
    InvertedResidualSpec::new(80, 3, 184, 80, false, HS, 1),
    InvertedResidualSpec::new(80, 3, 480, 112, true, HS, 1),
    InvertedResidualSpec::new(112, 3, 672, 112, true, HS, 1),
    InvertedResidualSpec::new(112, 5, 672, 160, true, HS, 2),
    InvertedResidualSpec::new(160, 5, 960, 160, true, HS, 1),
    InvertedResidualSpec::new(160, 5, 960, 160, true, HS, 1),
];

#[derive(Module, Debug)]
pub struct MobileNetV3Backbone<B: Backend> {
    stem: ConvBnAct<B>,
    blocks: Vec<InvertedResidual<B>>,
    last: ConvBnAct<B>,
}

impl<B: Backend> MobileNetV3Backbone<B> {
    pub fn new(device: &B::Device) -> Self {
        let blocks = MOBILENET_V3_LARGE
            .iter()
            .map(|spec| InvertedResidual::new(device, spec))
            .collect();

        Self {
            stem: ConvBnAct::new(device, 3, 16, 3, 2, 1, true, true),
            blocks,
            last: ConvBnAct::new(device, 160, BACKBONE_CHANNELS, 1, 1, 1, true, true),
        }
    }

    /// `[B, 3, H, W] -> [B, 960, H/32, W/32]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = self.stem.forward(x);
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.last.forward(x)
    }

    /// Loads pretrained weights written by `BinFileRecorder`.
    pub fn load_weights(self, path: &Path, device: &B::Device) -> Result<Self> {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path.to_path_buf(), device)
            .map_err(|e| anyhow!("failed to load backbone weights {}: {:?}", path.display(), e))?;

        log::info!("Loaded backbone weights from {}", path.display());
        Ok(self.load_record(record))
    }
}
