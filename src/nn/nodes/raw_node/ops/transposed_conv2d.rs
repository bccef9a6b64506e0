/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : 2D 转置卷积节点（解码器/生成器中的上采样）
 *
 * 输入：
 * - inputs[0]: 数据 [N, C, H, W]
 * - inputs[1]: 卷积核 [C, K, kH, kW]，与把[N, K, H', W']卷回[N, C, H, W]的那个卷积共用同一份核
 * 输出：[N, K, H', W']，其中 H' = (H-1)*stride_h - 2*pad_h + dilation_h*(kH-1) + 1，W'同理
 *
 * 前向恰好是同参数卷积对其输入求梯度的运算，因此两者互为伴随。
 */

use super::Conv2dParams;
use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use ndarray::Array4;
use rand::rngs::StdRng;

#[derive(Debug, Clone)]
pub struct TransposedConv2d {
    params: Conv2dParams,
}

impl TransposedConv2d {
    pub(crate) const fn new(params: Conv2dParams) -> Self {
        Self { params }
    }

    pub const fn params(&self) -> Conv2dParams {
        self.params
    }
}

impl TraitNode for TransposedConv2d {
    fn kind(&self) -> &'static str {
        "TransposedConv2d"
    }

    fn min_num_inputs(&self) -> usize {
        2
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        let p = self.params;
        p.validate(self.kind())?;

        let [n, c, h, w] = input_shapes[0];
        let [filter_c, k, kh, kw] = input_shapes[1];
        if c != filter_c {
            return Err(GraphError::ShapeMismatch {
                expected: vec![c],
                got: vec![filter_c],
                message: format!("输入通道数{c}与转置卷积核第0维{filter_c}不匹配"),
            });
        }

        let out_h = Conv2dParams::transposed_output_size(h, kh, p.pad_h, p.stride_h, p.dilation_h);
        let out_w = Conv2dParams::transposed_output_size(w, kw, p.pad_w, p.stride_w, p.dilation_w);
        match (out_h, out_w) {
            (Some(out_h), Some(out_w)) => Ok(vec![[n, k, out_h, out_w]]),
            _ => Err(GraphError::InvalidOperation(format!(
                "转置卷积输出尺寸无效：输入{h}x{w}，核{kh}x{kw}，参数{p:?}"
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
        let (n, c, h, w) = x.dim();
        let (_, k, kh, kw) = f.dim();
        let [_, _, out_h, out_w] = outputs[0].dims();

        // 把每个输入像素按卷积核“散射”到输出上
        let mut y = Array4::<f32>::zeros((n, k, out_h, out_w));
        for ni in 0..n {
            for ci in 0..c {
                for ih in 0..h {
                    for iw in 0..w {
                        let v = x[[ni, ci, ih, iw]];
                        if v == 0. {
                            continue;
                        }
                        for ki in 0..k {
                            for i in 0..kh {
                                for j in 0..kw {
                                    if let Some((oh, ow)) = self.params.input_pos(ih, iw, i, j, out_h, out_w) {
                                        y[[ni, ki, oh, ow]] += v * f[[ci, ki, i, j]];
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        write_output(outputs, 0, &Tensor::from_array(y))
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
        let (_, k, kh, kw) = f.dim();
        let (_, _, out_h, out_w) = dy.dim();

        let mut dx = Array4::<f32>::zeros(x.raw_dim());
        let mut df = Array4::<f32>::zeros(f.raw_dim());
        for ni in 0..n {
            for ci in 0..c {
                for ih in 0..h {
                    for iw in 0..w {
                        let v = x[[ni, ci, ih, iw]];
                        let mut acc = 0.;
                        for ki in 0..k {
                            for i in 0..kh {
                                for j in 0..kw {
                                    if let Some((oh, ow)) = self.params.input_pos(ih, iw, i, j, out_h, out_w) {
                                        let g = dy[[ni, ki, oh, ow]];
                                        acc += g * f[[ci, ki, i, j]];
                                        df[[ci, ki, i, j]] += g * v;
                                    }
                                }
                            }
                        }
                        dx[[ni, ci, ih, iw]] = acc;
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
        NodeTypeDescriptor::TransposedConv2d {
            params: self.params,
        }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!(
            "transposed_conv2d({}, {}, {:?}, Some({name:?}))",
            inputs[0], inputs[1], self.params
        )
    }
}
