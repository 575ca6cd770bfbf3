use burn::prelude::*;

use super::{ConvBnAct, SqueezeExcitation};

/// One row of the MobileNetV3 block table.
#[derive(Debug, Clone, Copy)]
pub struct InvertedResidualSpec {
    pub in_channels: usize,
    pub kernel_size: usize,
    pub expanded_channels: usize,
    pub out_channels: usize,
    pub use_se: bool,
    pub hard_swish: bool,
    pub stride: usize,
}

impl InvertedResidualSpec {
    pub const fn new(
        in_channels: usize,
        kernel_size: usize,
        expanded_channels: usize,
        out_channels: usize,
        use_se: bool,
        hard_swish: bool,
        stride: usize,
    ) -> Self {
        Self {
            in_channels,
            kernel_size,
            expanded_channels,
            out_channels,
            use_se,
            hard_swish,
            stride,
        }
    }
}

#[derive(Module, Debug)]
pub struct InvertedResidual<B: Backend> {
    expand: Option<ConvBnAct<B>>,
    depthwise: ConvBnAct<B>,
    se: Option<SqueezeExcitation<B>>,
    project: ConvBnAct<B>,
    residual: bool,
}

impl<B: Backend> InvertedResidual<B> {
    pub fn new(device: &B::Device, spec: &InvertedResidualSpec) -> Self {
        let expand = (spec.expanded_channels != spec.in_channels).then(|| {
            ConvBnAct::new(
                device,
                spec.in_channels,
                spec.expanded_channels,
                1,
                1,
                1,
                spec.hard_swish,
                true,
            )
        });

        let depthwise = ConvBnAct::new(
            device,
            spec.expanded_channels,
            spec.expanded_channels,
            spec.kernel_size,
            spec.stride,
            spec.expanded_channels,
            spec.hard_swish,
            true,
        );

        let se = spec
            .use_se
            .then(|| SqueezeExcitation::new(device, spec.expanded_channels, 4));

        let project = ConvBnAct::new(
            device,
            spec.expanded_channels,
            spec.out_channels,
            1,
            1,
            1,
            false,
            false,
        );

        Self {
            expand,
            depthwise,
            se,
            project,
            residual: spec.stride == 1 && spec.in_channels == spec.out_channels,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut y = match &self.expand {
            Some(expand) => expand.forward(x.clone()),
            None => x.clone(),
        };
        y = self.depthwise.forward(y);
        if let Some(se) = &self.se {
            y = se.forward(y);
        }
        y = self.project.forward(y);

        if self.residual {
            y + x
        } else {
            y
        }
    }
}
