use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use ndarray::Zip;

impl Tensor {
    /// 用纯数填满整个张量（形状不变）
    pub fn fill(&mut self, value: f32) {
        self.data_mut().fill(value);
    }

    /// 把`other`的值拷贝进来，两者形状必须一致
    pub fn assign(&mut self, other: &Tensor) -> Result<(), TensorError> {
        if !self.is_same_shape(other) {
            return Err(TensorError::OperatorError {
                operator: Operator::Assign,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            });
        }
        self.data_mut().assign(other.data());
        Ok(())
    }

    /// 逐元素映射，返回新张量
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Tensor {
        Tensor::from_array(self.data().mapv(f))
    }

    /// 两个同形张量逐元素组合，返回新张量
    pub fn zip_map(&self, other: &Tensor, f: impl Fn(f32, f32) -> f32) -> Tensor {
        assert!(
            self.is_same_shape(other),
            "{}",
            TensorError::OperatorError {
                operator: Operator::Mul,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            }
        );
        let data = Zip::from(self.data())
            .and(other.data())
            .map_collect(|&a, &b| f(a, b));
        Tensor::from_array(data)
    }

    pub fn sum(&self) -> f32 {
        self.data().sum()
    }

    pub fn mean(&self) -> f32 {
        self.sum() / self.size() as f32
    }

    pub fn max_value(&self) -> f32 {
        self.data().iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn sqrt(&self) -> Tensor {
        self.map(f32::sqrt)
    }

    /// 逐元素的符号（正数为1，负数为-1，零为0）
    pub fn signum(&self) -> Tensor {
        self.map(|x| if x > 0. { 1. } else if x < 0. { -1. } else { 0. })
    }
}
