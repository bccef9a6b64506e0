/*
 * @Author       : 老董
 * @Date         : 2026-02-04
 * @Description  : 2D 卷积节点
 *
 * 输入：
 * - inputs[0]: 数据 [N, C, H, W]
 * - inputs[1]: 卷积核 [K, C, kH, kW]（通常是 Variable）
 * 输出：[N, K, H', W']，其中 H' = (H + 2*pad_h - dilation_h*(kH-1) - 1) / stride_h + 1，W'同理
 */

use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use ndarray::Array4;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// 卷积的填充/步长/膨胀参数（纵向h、横向w各一份）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conv2dParams {
    pub pad_h: usize,
    pub pad_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
    pub dilation_h: usize,
    pub dilation_w: usize,
}

impl Default for Conv2dParams {
    fn default() -> Self {
        Self {
            pad_h: 0,
            pad_w: 0,
            stride_h: 1,
            stride_w: 1,
            dilation_h: 1,
            dilation_w: 1,
        }
    }
}

impl Conv2dParams {
    /// 纵横相同的填充与步长，膨胀为1
    pub const fn new(pad: usize, stride: usize) -> Self {
        Self {
            pad_h: pad,
            pad_w: pad,
            stride_h: stride,
            stride_w: stride,
            dilation_h: 1,
            dilation_w: 1,
        }
    }

    /// 单个空间维度上的输出尺寸；窗口大于填充后的输入时返回None
    pub(crate) fn output_size(input: usize, kernel: usize, pad: usize, stride: usize, dilation: usize) -> Option<usize> {
        let effective = dilation * (kernel.checked_sub(1)?) + 1;
        let padded = input + 2 * pad;
        if padded < effective {
            return None;
        }
        Some((padded - effective) / stride + 1)
    }

    /// 转置卷积在单个空间维度上的输出尺寸，即以该尺寸为输入的卷积恰好得到`input`；结果不为正时返回None
    pub(crate) fn transposed_output_size(
        input: usize,
        kernel: usize,
        pad: usize,
        stride: usize,
        dilation: usize,
    ) -> Option<usize> {
        let full = (input.checked_sub(1)?) * stride + dilation * (kernel.checked_sub(1)?) + 1;
        full.checked_sub(2 * pad).filter(|&size| size > 0)
    }

    /// 步长与膨胀必须为正
    pub(crate) fn validate(&self, kind: &str) -> Result<(), GraphError> {
        if self.stride_h == 0 || self.stride_w == 0 || self.dilation_h == 0 || self.dilation_w == 0 {
            return Err(GraphError::InvalidOperation(format!(
                "{kind}的步长与膨胀必须为正整数，得到{self:?}"
            )));
        }
        Ok(())
    }

    /// 卷积输出位置(oh, ow)与卷积核位置(i, j)对应的输入坐标（输入尺寸h x w）；落在填充区时返回None
    pub(crate) fn input_pos(&self, oh: usize, ow: usize, i: usize, j: usize, h: usize, w: usize) -> Option<(usize, usize)> {
        let ih = (oh * self.stride_h + i * self.dilation_h).checked_sub(self.pad_h)?;
        let iw = (ow * self.stride_w + j * self.dilation_w).checked_sub(self.pad_w)?;
        (ih < h && iw < w).then_some((ih, iw))
    }
}

#[derive(Debug, Clone)]
pub struct Conv2d {
    params: Conv2dParams,
}

impl Conv2d {
    pub(crate) const fn new(params: Conv2dParams) -> Self {
        Self { params }
    }

    pub const fn params(&self) -> Conv2dParams {
        self.params
    }
}

impl TraitNode for Conv2d {
    fn kind(&self) -> &'static str {
        "Conv2d"
    }

    fn min_num_inputs(&self) -> usize {
        2
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        let p = self.params;
        // 1. 参数组合校验
        p.validate(self.kind())?;

        // 2. 通道数匹配
        let [n, c, h, w] = input_shapes[0];
        let [k, filter_c, kh, kw] = input_shapes[1];
        if c != filter_c {
            return Err(GraphError::ShapeMismatch {
                expected: vec![c],
                got: vec![filter_c],
                message: format!("输入通道数{c}与卷积核输入通道数{filter_c}不匹配"),
            });
        }

        // 3. 输出尺寸
        let out_h = Conv2dParams::output_size(h, kh, p.pad_h, p.stride_h, p.dilation_h);
        let out_w = Conv2dParams::output_size(w, kw, p.pad_w, p.stride_w, p.dilation_w);
        match (out_h, out_w) {
            (Some(out_h), Some(out_w)) => Ok(vec![[n, k, out_h, out_w]]),
            _ => Err(GraphError::InvalidOperation(format!(
                "卷积输出尺寸无效：输入{h}x{w}，核{kh}x{kw}，参数{p:?}"
            ))),
        }
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let (x, f) = (inputs[0].view(), inputs[1].view());
        let (_, c, h, w) = x.dim();
        let (_, _, kh, kw) = f.dim();
        let dims = outputs[0].dims();

        let data = Array4::from_shape_fn(dims, |(ni, ki, oh, ow)| {
            let mut sum = 0.;
            for ci in 0..c {
                for i in 0..kh {
                    for j in 0..kw {
                        if let Some((ih, iw)) = self.params.input_pos(oh, ow, i, j, h, w) {
                            sum += x[[ni, ci, ih, iw]] * f[[ki, ci, i, j]];
                        }
                    }
                }
            }
            sum
        });
        write_output(outputs, 0, &Tensor::from_array(data))
    }

    fn backward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        let diff = output_diff(outputs, 0, self.kind())?;
        let (x, f, dy) = (inputs[0].view(), inputs[1].view(), diff.view());
        let (n, c, h, w) = x.dim();
        let (k, _, kh, kw) = f.dim();
        let (_, _, out_h, out_w) = dy.dim();

        let mut dx = Array4::<f32>::zeros(x.raw_dim());
        let mut df = Array4::<f32>::zeros(f.raw_dim());
        for ni in 0..n {
            for ki in 0..k {
                for oh in 0..out_h {
                    for ow in 0..out_w {
                        let g = dy[[ni, ki, oh, ow]];
                        if g == 0. {
                            continue;
                        }
                        for ci in 0..c {
                            for i in 0..kh {
                                for j in 0..kw {
                                    if let Some((ih, iw)) = self.params.input_pos(oh, ow, i, j, h, w) {
                                        dx[[ni, ci, ih, iw]] += g * f[[ki, ci, i, j]];
                                        df[[ki, ci, i, j]] += g * x[[ni, ci, ih, iw]];
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(vec![
            needs[0].then(|| Tensor::from_array(dx)),
            needs[1].then(|| Tensor::from_array(df)),
        ])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Conv2d {
            params: self.params,
        }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!(
            "conv2d({}, {}, {:?}, Some({name:?}))",
            inputs[0], inputs[1], self.params
        )
    }
}
