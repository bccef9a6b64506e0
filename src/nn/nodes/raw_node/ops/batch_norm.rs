/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : 批归一化节点
 *
 * 输入：
 * - inputs[0]: 数据 [N, C, H, W]
 * - inputs[1]: 缩放 scale，形状为统计量形状
 * - inputs[2]: 偏置 bias，形状同上
 * 统计量形状：`Spatial`为[1, C, 1, 1]（每个通道在N、H、W上统计），
 *             `PerActivation`为[1, C, H, W]（每个位置只在N上统计）。
 *
 * 训练相位（或没有相位）下用本批的均值与方差，并按`momentum`更新滑动统计量；
 * 其余相位下用滑动统计量。输出 y = scale * (x - mean) / sqrt(var + epsilon) + bias。
 */

use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use ndarray::Array4;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

type Index4 = (usize, usize, usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchNormMode {
    /// 每个通道一组统计量（卷积层之后）
    Spatial,
    /// 每个激活位置一组统计量（全连接层之后）
    PerActivation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchNormParams {
    pub mode: BatchNormMode,
    pub epsilon: f32,
    /// 滑动统计量的更新系数：running = (1 - momentum) * running + momentum * batch
    pub momentum: f32,
}

impl Default for BatchNormParams {
    fn default() -> Self {
        Self {
            mode: BatchNormMode::Spatial,
            epsilon: 1e-5,
            momentum: 0.1,
        }
    }
}

impl BatchNormParams {
    pub fn new(mode: BatchNormMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }
}

/// 前向留给反向的中间结果
#[derive(Debug, Clone)]
struct BatchCache {
    normalized: Array4<f32>,
    inv_std: Array4<f32>,
    batch_stats: bool,
}

#[derive(Debug, Clone)]
pub struct BatchNormalization {
    params: BatchNormParams,
    stats_dims: Shape4,
    running_mean: Array4<f32>,
    running_var: Array4<f32>,
    cache: Option<BatchCache>,
}

impl BatchNormalization {
    pub(crate) fn new(params: BatchNormParams) -> Self {
        Self {
            params,
            stats_dims: [1, 1, 1, 1],
            running_mean: Array4::zeros((1, 1, 1, 1)),
            running_var: Array4::ones((1, 1, 1, 1)),
            cache: None,
        }
    }

    pub const fn params(&self) -> BatchNormParams {
        self.params
    }

    pub fn running_mean(&self) -> Tensor {
        Tensor::from_array(self.running_mean.clone())
    }

    pub fn running_var(&self) -> Tensor {
        Tensor::from_array(self.running_var.clone())
    }

    /// 数据位置对应的统计量位置
    fn stats_pos(&self, (_, c, h, w): Index4) -> Index4 {
        match self.params.mode {
            BatchNormMode::Spatial => (0, c, 0, 0),
            BatchNormMode::PerActivation => (0, c, h, w),
        }
    }

    /// 本批每组统计量的 (均值, 有偏方差, 每组样本数)
    fn batch_stats(&self, x: &Tensor) -> (Array4<f32>, Array4<f32>, usize) {
        let x = x.view();
        let total = x.len();
        let groups = self.stats_dims.iter().product::<usize>();
        let count = total / groups;

        let mut mean = Array4::<f32>::zeros(self.stats_dims);
        for (idx, &v) in x.indexed_iter() {
            mean[self.stats_pos(idx)] += v;
        }
        mean.mapv_inplace(|s| s / count as f32);

        let mut var = Array4::<f32>::zeros(self.stats_dims);
        for (idx, &v) in x.indexed_iter() {
            let pos = self.stats_pos(idx);
            var[pos] += (v - mean[pos]).powi(2);
        }
        var.mapv_inplace(|s| s / count as f32);
        (mean, var, count)
    }
}

impl TraitNode for BatchNormalization {
    fn kind(&self) -> &'static str {
        "BatchNormalization"
    }

    fn min_num_inputs(&self) -> usize {
        3
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        let p = self.params;
        if p.epsilon <= 0. || !(0. ..=1.).contains(&p.momentum) {
            return Err(GraphError::InvalidOperation(format!(
                "批归一化要求epsilon > 0且momentum在[0, 1]内，得到{p:?}"
            )));
        }
        let [n, c, h, w] = input_shapes[0];
        let stats_dims = match p.mode {
            BatchNormMode::Spatial => [1, c, 1, 1],
            BatchNormMode::PerActivation => [1, c, h, w],
        };
        if n * stats_dims.iter().product::<usize>() == 0 {
            return Err(GraphError::InvalidOperation("批归一化的输入不能为空".to_string()));
        }
        for (slot, role) in [(1, "缩放"), (2, "偏置")] {
            if input_shapes[slot] != stats_dims {
                return Err(GraphError::ShapeMismatch {
                    expected: stats_dims.to_vec(),
                    got: input_shapes[slot].to_vec(),
                    message: format!("批归一化（{:?}）的{role}输入形状不符", p.mode),
                });
            }
        }

        self.stats_dims = stats_dims;
        self.running_mean = Array4::zeros(stats_dims);
        self.running_var = Array4::ones(stats_dims);
        self.cache = None;
        Ok(vec![input_shapes[0]])
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let batch_stats = ctx.is_training();
        let (mean, var) = if batch_stats {
            let (mean, var, count) = self.batch_stats(inputs[0]);
            // 滑动方差用无偏估计
            let unbias = if count > 1 {
                count as f32 / (count - 1) as f32
            } else {
                1.
            };
            let m = self.params.momentum;
            self.running_mean = &self.running_mean * (1. - m) + &mean * m;
            self.running_var = &self.running_var * (1. - m) + &var * (m * unbias);
            (mean, var)
        } else {
            (self.running_mean.clone(), self.running_var.clone())
        };

        let eps = self.params.epsilon;
        let inv_std = var.mapv(|v| 1. / (v + eps).sqrt());
        let (x, scale, bias) = (inputs[0].view(), inputs[1].view(), inputs[2].view());
        let normalized = Array4::from_shape_fn(x.dim(), |idx| {
            let pos = self.stats_pos(idx);
            (x[idx] - mean[pos]) * inv_std[pos]
        });
        let y = Array4::from_shape_fn(x.dim(), |idx| {
            let pos = self.stats_pos(idx);
            scale[pos] * normalized[idx] + bias[pos]
        });

        self.cache = Some(BatchCache {
            normalized,
            inv_std,
            batch_stats,
        });
        write_output(outputs, 0, &Tensor::from_array(y))
    }

    fn backward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        let cache = self.cache.as_ref().ok_or_else(|| {
            GraphError::ComputationError("批归一化节点在前向之前被要求反向".to_string())
        })?;
        let dy = output_diff(outputs, 0, self.kind())?.view();
        let scale = inputs[1].view();
        let xhat = &cache.normalized;

        let mut dscale = Array4::<f32>::zeros(self.stats_dims);
        let mut dbias = Array4::<f32>::zeros(self.stats_dims);
        // Σ dxhat 与 Σ dxhat·xhat，dxhat = dy·scale
        let mut sum_dxhat = Array4::<f32>::zeros(self.stats_dims);
        let mut sum_dxhat_xhat = Array4::<f32>::zeros(self.stats_dims);
        for (idx, &g) in dy.indexed_iter() {
            let pos = self.stats_pos(idx);
            dbias[pos] += g;
            dscale[pos] += g * xhat[idx];
            let dxhat = g * scale[pos];
            sum_dxhat[pos] += dxhat;
            sum_dxhat_xhat[pos] += dxhat * xhat[idx];
        }

        let dx = needs[0].then(|| {
            let count = (dy.len() / self.stats_dims.iter().product::<usize>()) as f32;
            let dx = Array4::from_shape_fn(dy.dim(), |idx| {
                let pos = self.stats_pos(idx);
                let dxhat = dy[idx] * scale[pos];
                if cache.batch_stats {
                    cache.inv_std[pos] / count
                        * (count * dxhat - sum_dxhat[pos] - xhat[idx] * sum_dxhat_xhat[pos])
                } else {
                    dxhat * cache.inv_std[pos]
                }
            });
            Tensor::from_array(dx)
        });

        Ok(vec![
            dx,
            needs[1].then(|| Tensor::from_array(dscale)),
            needs[2].then(|| Tensor::from_array(dbias)),
        ])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::BatchNormalization {
            params: self.params,
        }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        let p = &self.params;
        format!(
            "batch_normalization({}, {}, {}, BatchNormParams {{ mode: BatchNormMode::{:?}, epsilon: {:?}, momentum: {:?} }}, Some({name:?}))",
            inputs[0], inputs[1], inputs[2], p.mode, p.epsilon, p.momentum
        )
    }
}
