mod loss;
mod softmax_loss;
mod square_error;

pub use loss::{Loss, LossReduction};
pub use softmax_loss::SoftmaxLoss;
pub use square_error::SquareError;
