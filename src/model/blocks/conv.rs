use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, PaddingConfig2d};
use burn::prelude::*;
use burn::tensor::activation;

/// Padding that keeps the spatial size for a stride-1 convolution.
pub fn same_padding(kernel_size: usize, dilation: usize) -> usize {
    dilation * (kernel_size - 1) / 2
}

/// Builds a square convolution with "same" padding and a bias term.
pub fn same_conv<B: Backend>(
    device: &B::Device,
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    dilation: usize,
) -> Conv2d<B> {
    let padding = same_padding(kernel_size, dilation);

    Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
        .with_dilation([dilation, dilation])
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .init(device)
}

/// Convolution followed by ReLU, spatial size preserved.
#[derive(Module, Debug)]
pub struct ConvRelu<B: Backend> {
    conv: Conv2d<B>,
}

impl<B: Backend> ConvRelu<B> {
    pub fn new(
        device: &B::Device,
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        dilation: usize,
    ) -> Self {
        Self {
            conv: same_conv(device, in_channels, out_channels, kernel_size, dilation),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        activation::relu(self.conv.forward(x))
    }
}

/// `x * hard_sigmoid(x)` with the MobileNetV3 slope.
pub fn hard_swish<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    activation::hard_sigmoid(x.clone(), 1.0 / 6.0, 0.5) * x
}

/// Conv + BatchNorm + optional activation, as used by the MobileNetV3 backbone.
#[derive(Module, Debug)]
pub struct ConvBnAct<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B>,
    hard_swish: bool,
    activate: bool,
}

impl<B: Backend> ConvBnAct<B> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &B::Device,
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        groups: usize,
        hard_swish: bool,
        activate: bool,
    ) -> Self {
        let padding = same_padding(kernel_size, 1);

        Self {
            conv: Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
                .with_stride([stride, stride])
                .with_padding(PaddingConfig2d::Explicit(padding, padding))
                .with_groups(groups)
                .with_bias(false)
                .init(device),
            bn: BatchNormConfig::new(out_channels).init(device),
            hard_swish,
            activate,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);

        match (self.activate, self.hard_swish) {
            (false, _) => x,
            (true, true) => hard_swish(x),
            (true, false) => activation::relu(x),
        }
    }
}
