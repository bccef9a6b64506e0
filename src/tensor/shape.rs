use super::Tensor;
use crate::errors::TensorError;

/// 张量的4维形状：`[n, c, h, w]`
pub type Shape4 = [usize; 4];

/// 把1~4维的形状补齐为4维；0维视为标量。超过4维则返回错误。
pub fn normalize_dims(shape: &[usize]) -> Result<Shape4, TensorError> {
    match *shape {
        [] => Ok([1, 1, 1, 1]),
        [d0] => Ok([1, d0, 1, 1]),
        [d0, d1] => Ok([d0, d1, 1, 1]),
        [d0, d1, d2] => Ok([d0, 1, d1, d2]),
        [d0, d1, d2, d3] => Ok([d0, d1, d2, d3]),
        _ => Err(TensorError::UnsupportedRank(shape.len())),
    }
}

impl Tensor {
    /// 以新形状重新解释数据（元素个数须一致）
    pub fn reshape(&self, shape: &[usize]) -> Result<Tensor, TensorError> {
        let dims = normalize_dims(shape)?;
        if dims.iter().product::<usize>() != self.size() {
            return Err(TensorError::DataLenMismatch {
                data_len: self.size(),
                shape: shape.to_vec(),
            });
        }
        Ok(Tensor::new(&self.to_vec(), &dims))
    }
}
