use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use std::ops::AddAssign;

impl<'a> AddAssign<&'a Tensor> for Tensor {
    fn add_assign(&mut self, other: &'a Tensor) {
        assert!(
            self.is_same_shape(other),
            "{}",
            TensorError::OperatorError {
                operator: Operator::AddAssign,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            }
        );
        *self.data_mut() += other.data();
    }
}

impl AddAssign for Tensor {
    fn add_assign(&mut self, other: Tensor) {
        *self += &other;
    }
}
