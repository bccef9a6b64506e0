mod activation;
mod add;
mod batch_norm;
mod bias_add;
mod conv2d;
mod dropout;
mod elementwise;
mod equal;
mod lifting;
mod mat_mul;
mod pooling;
mod reduce;
mod restructure;
mod softmax;
mod transposed_conv2d;

pub use activation::{Activation, ActivationMode};
pub use add::Add;
pub use batch_norm::{BatchNormMode, BatchNormParams, BatchNormalization};
pub use bias_add::BiasAdd;
pub use conv2d::{Conv2d, Conv2dParams};
pub use dropout::Dropout;
pub use elementwise::{Elementwise, ElementwiseOp};
pub use equal::Equal;
pub use lifting::{Lifting, LiftingMode};
pub use mat_mul::MatMul;
pub use pooling::{Pooling, PoolingParams};
pub use reduce::{Reduce, ReduceOp};
pub use restructure::Restructure;
pub(crate) use softmax::{channel_softmax, channel_softmax_grad};
pub use softmax::Softmax;
pub use transposed_conv2d::TransposedConv2d;
