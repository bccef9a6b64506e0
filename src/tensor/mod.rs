/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @Description  : 计算图中流动的4维张量（N, C, H, W）。
 *                 所有张量统一以4维存储：构造时的1~4维形状会按固定规则补齐为4维。
 */

use ndarray::Array4;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::TensorError;

mod ops {
    pub mod add;
    pub mod add_assign;
    pub mod mat_mul;
    pub mod mul;
    pub mod others;
    pub mod sub;
}

mod property;
mod shape;

pub use shape::{normalize_dims, Shape4};


/// 定义张量的结构体。无论标量、向量还是矩阵，内部一律是形状为`[n, c, h, w]`的4维数组。
/// 注：只要通过Tensor初始化的都是张量（即使标量也是张量）；
/// 而通常意义上的数字（类型为usize、f32等）就只是纯数（number），在这里不被认为是张量。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    data: Array4<f32>,
}

impl Tensor {
    /// 创建一个张量。`shape`的维数可以是0~4：
    /// * `[]` => `[1,1,1,1]`（标量）
    /// * `[d0]` => `[1,d0,1,1]`
    /// * `[d0,d1]` => `[d0,d1,1,1]`
    /// * `[d0,d1,d2]` => `[d0,1,d1,d2]`
    /// * `[d0,d1,d2,d3]` 保持不变
    ///
    /// `data`按行优先（最后一维变化最快）排列，其长度必须和补齐后形状的元素个数一致，否则会panic。
    pub fn new(data: &[f32], shape: &[usize]) -> Tensor {
        let dims = match normalize_dims(shape) {
            Ok(dims) => dims,
            Err(e) => panic!("{}", e),
        };
        let len = dims.iter().product::<usize>();
        assert!(
            data.len() == len,
            "{}",
            TensorError::DataLenMismatch {
                data_len: data.len(),
                shape: shape.to_vec(),
            }
        );
        let [_, c, h, w] = dims;
        let data = Array4::from_shape_fn(dims, |(n, ci, hi, wi)| {
            data[((n * c + ci) * h + hi) * w + wi]
        });
        Tensor { data }
    }

    /// 用给定的纯数填满一个指定形状的张量
    pub fn full(value: f32, dims: Shape4) -> Tensor {
        Tensor {
            data: Array4::from_elem(dims, value),
        }
    }

    pub fn zeros(dims: Shape4) -> Tensor {
        Self::full(0., dims)
    }

    pub fn ones(dims: Shape4) -> Tensor {
        Self::full(1., dims)
    }

    /// 创建一个随机张量，其值在[min, max]的闭区间。
    /// 随机数由调用方传入的`rng`产生，故同一种子下结果可复现。
    pub fn uniform_with_rng(min: f32, max: f32, dims: Shape4, rng: &mut StdRng) -> Tensor {
        let data = Array4::from_shape_simple_fn(dims, || {
            if min < max {
                rng.gen_range(min..=max)
            } else {
                min
            }
        });
        Tensor { data }
    }

    /// 创建一个服从正态分布的随机张量（Box-Muller变换）
    pub fn normal_with_rng(mean: f32, std_dev: f32, dims: Shape4, rng: &mut StdRng) -> Tensor {
        let data_len = dims.iter().product::<usize>();
        let mut data = Vec::with_capacity(data_len);

        while data.len() < data_len {
            let u1: f32 = rng.gen();
            let u2: f32 = rng.gen();
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f32::consts::PI * u2;
            let z0 = mean + std_dev * r * theta.cos();
            let z1 = mean + std_dev * r * theta.sin();

            if z0.is_finite() {
                data.push(z0);
            }
            if data.len() < data_len && z1.is_finite() {
                data.push(z1);
            }
        }

        Tensor::new(&data, &dims)
    }

    pub(crate) fn from_array(data: Array4<f32>) -> Tensor {
        Tensor { data }
    }
}
