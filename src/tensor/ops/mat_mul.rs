use crate::errors::TensorError;
use crate::tensor::Tensor;
use ndarray::{Array2, Array4};

impl Tensor {
    /// 实现矩阵乘法。两个张量都被视为2维矩阵：行数为`n`，列数为`c*h*w`。
    /// 需要保证前者的列数等于后者的行数，否则返回错误。
    /// 结果形状为`[前者行数, 后者列数, 1, 1]`。
    pub fn mat_mul(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        let a = self.as_matrix();
        let b = other.as_matrix();
        if a.ncols() != b.nrows() {
            return Err(TensorError::MatMulMismatch(
                self.shape().to_vec(),
                other.shape().to_vec(),
            ));
        }
        let m = a.dot(&b);
        let data = Array4::from_shape_fn([m.nrows(), m.ncols(), 1, 1], |(r, c, _, _)| m[[r, c]]);
        Ok(Tensor::from_array(data))
    }

    /// 矩阵转置（同样按`n x (c*h*w)`的二维视角），结果形状为`[c*h*w, n, 1, 1]`
    pub fn transpose(&self) -> Tensor {
        let m = self.as_matrix();
        let data = Array4::from_shape_fn([m.ncols(), m.nrows(), 1, 1], |(r, c, _, _)| m[[c, r]]);
        Tensor::from_array(data)
    }

    pub(crate) fn as_matrix(&self) -> Array2<f32> {
        let [n, c, h, w] = self.dims();
        let cols = c * h * w;
        let flat = self.to_vec();
        Array2::from_shape_fn((n, cols), |(r, col)| flat[r * cols + col])
    }
}
