/*
 * @Author       : 老董
 * @Date         : 2023-10-21 03:22:26
 * @Description  : 本类仅包含一些属性方法，不包含任何运算方法
 */

use super::{Shape4, Tensor};
use ndarray::{Array4, ArrayView4};

impl Tensor {
    /// 固定为4个元素：`[n, c, h, w]`
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn dims(&self) -> Shape4 {
        let (n, c, h, w) = self.data.dim();
        [n, c, h, w]
    }

    /// 计算张量中所有元素的数量
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 判断两个张量的形状是否严格一致
    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    /// 转化为纯数（number）。若只含一个元素，则返回Some(number)，否则返回None
    pub fn number(&self) -> Option<f32> {
        if self.size() == 1 {
            self.data.iter().next().copied()
        } else {
            None
        }
    }

    /// 按行优先顺序导出所有元素
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    pub(crate) fn data(&self) -> &Array4<f32> {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut Array4<f32> {
        &mut self.data
    }
}

impl approx::AbsDiffEq for Tensor {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.is_same_shape(other)
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

impl std::fmt::Display for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tensor{:?} {:?}", self.shape(), self.to_vec())
    }
}
