/*
 * @Author       : 老董
 * @Date         : 2026-02-04
 * @Description  : 2D 最大池化节点
 *
 * 输入 [N, C, H, W]，输出 [N, C, H', W']，其中 H' = (H + 2*pad_h - window_h) / stride_h + 1，W'同理。
 * 填充区不参与取最大值；前向时记录每个输出取自哪个输入位置，反向时把梯度只传回该位置。
 */

use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use ndarray::Array4;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolingParams {
    pub window_h: usize,
    pub window_w: usize,
    pub pad_h: usize,
    pub pad_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
}

impl Default for PoolingParams {
    fn default() -> Self {
        Self {
            window_h: 3,
            window_w: 3,
            pad_h: 0,
            pad_w: 0,
            stride_h: 1,
            stride_w: 1,
        }
    }
}

impl PoolingParams {
    /// 方形窗口，步长等于窗口大小，无填充
    pub const fn square(window: usize) -> Self {
        Self {
            window_h: window,
            window_w: window,
            pad_h: 0,
            pad_w: 0,
            stride_h: window,
            stride_w: window,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pooling {
    params: PoolingParams,
    /// 每个输出元素对应的输入坐标（h, w），前向时写入
    argmax: Array4<(usize, usize)>,
}

impl Pooling {
    pub(crate) fn new(params: PoolingParams) -> Self {
        Self {
            params,
            argmax: Array4::from_elem([0, 0, 0, 0], (0, 0)),
        }
    }

    pub const fn params(&self) -> PoolingParams {
        self.params
    }
}

impl TraitNode for Pooling {
    fn kind(&self) -> &'static str {
        "MaxPool"
    }

    fn min_num_inputs(&self) -> usize {
        1
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        let p = self.params;
        if p.stride_h == 0 || p.stride_w == 0 || p.window_h == 0 || p.window_w == 0 {
            return Err(GraphError::InvalidOperation(format!(
                "池化的窗口与步长必须为正整数，得到{p:?}"
            )));
        }
        // 填充不能大于等于窗口，否则会出现完全落在填充区的窗口
        if p.pad_h >= p.window_h || p.pad_w >= p.window_w {
            return Err(GraphError::InvalidOperation(format!(
                "池化的填充必须小于窗口大小，得到{p:?}"
            )));
        }
        let [n, c, h, w] = input_shapes[0];
        if h + 2 * p.pad_h < p.window_h || w + 2 * p.pad_w < p.window_w {
            return Err(GraphError::InvalidOperation(format!(
                "池化窗口大于填充后的输入：输入{h}x{w}，参数{p:?}"
            )));
        }
        let out_h = (h + 2 * p.pad_h - p.window_h) / p.stride_h + 1;
        let out_w = (w + 2 * p.pad_w - p.window_w) / p.stride_w + 1;
        let dims = [n, c, out_h, out_w];
        self.argmax = Array4::from_elem(dims, (0, 0));
        Ok(vec![dims])
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let p = self.params;
        let x = inputs[0].view();
        let (_, _, h, w) = x.dim();
        let dims = outputs[0].dims();
        let mut data = Array4::<f32>::zeros(dims);

        for ((ni, ci, oh, ow), out) in data.indexed_iter_mut() {
            let mut best = f32::NEG_INFINITY;
            let mut best_pos = (0, 0);
            for i in 0..p.window_h {
                for j in 0..p.window_w {
                    let ih = (oh * p.stride_h + i).checked_sub(p.pad_h);
                    let iw = (ow * p.stride_w + j).checked_sub(p.pad_w);
                    if let (Some(ih), Some(iw)) = (ih, iw) {
                        if ih < h && iw < w && x[[ni, ci, ih, iw]] > best {
                            best = x[[ni, ci, ih, iw]];
                            best_pos = (ih, iw);
                        }
                    }
                }
            }
            *out = best;
            self.argmax[[ni, ci, oh, ow]] = best_pos;
        }
        write_output(outputs, 0, &Tensor::from_array(data))
    }

    fn backward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        if !needs[0] {
            return Ok(vec![None]);
        }
        let dy = output_diff(outputs, 0, self.kind())?.view();
        let mut dx = Array4::<f32>::zeros(inputs[0].dims());
        for ((ni, ci, oh, ow), &(ih, iw)) in self.argmax.indexed_iter() {
            dx[[ni, ci, ih, iw]] += dy[[ni, ci, oh, ow]];
        }
        Ok(vec![Some(Tensor::from_array(dx))])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Pooling {
            params: self.params,
        }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!("pooling({}, {:?}, Some({name:?}))", inputs[0], self.params)
    }
}
