pub mod conv;
pub mod inverted_residual;
pub mod squeeze_excitation;

pub use conv::{hard_swish, same_conv, same_padding, ConvBnAct, ConvRelu};
pub use inverted_residual::{InvertedResidual, InvertedResidualSpec};
pub use squeeze_excitation::{make_divisible, SqueezeExcitation};
