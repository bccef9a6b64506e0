/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @Description  : 张量的减法，两个张量的形状必须严格一致，否则会panic。
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use std::ops::Sub;

impl Sub<f32> for &Tensor {
    type Output = Tensor;

    fn sub(self, scalar: f32) -> Tensor {
        Tensor::from_array(self.data() - scalar)
    }
}

impl Sub for Tensor {
    type Output = Tensor;

    fn sub(self, other: Tensor) -> Tensor {
        sub_within_tensors(&self, &other)
    }
}
impl<'a> Sub<&'a Tensor> for Tensor {
    type Output = Tensor;

    fn sub(self, other: &'a Tensor) -> Tensor {
        sub_within_tensors(&self, other)
    }
}
impl<'a, 'b> Sub<&'b Tensor> for &'a Tensor {
    type Output = Tensor;

    fn sub(self, other: &'b Tensor) -> Tensor {
        sub_within_tensors(self, other)
    }
}

fn sub_within_tensors(a: &Tensor, b: &Tensor) -> Tensor {
    assert!(
        a.is_same_shape(b),
        "{}",
        TensorError::OperatorError {
            operator: Operator::Sub,
            tensor1_shape: a.shape().to_vec(),
            tensor2_shape: b.shape().to_vec(),
        }
    );
    Tensor::from_array(a.data() - b.data())
}
