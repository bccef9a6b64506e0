/*
 * @Author       : 老董
 * @Date         : 2026-02-15
 * @Description  : Softmax节点：在通道维C上归一化，H、W上每个位置各自独立
 */

use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use ndarray::{Array4, ArrayView4};
use rand::rngs::StdRng;

/// 通道维上的softmax（减去最大值保证数值稳定）
pub(crate) fn channel_softmax(logits: ArrayView4<f32>) -> Array4<f32> {
    let (n, c, h, w) = logits.dim();
    let mut probs = Array4::<f32>::zeros((n, c, h, w));
    for ni in 0..n {
        for hi in 0..h {
            for wi in 0..w {
                let max = (0..c)
                    .map(|ci| logits[[ni, ci, hi, wi]])
                    .fold(f32::NEG_INFINITY, f32::max);
                let mut sum = 0.;
                for ci in 0..c {
                    let e = (logits[[ni, ci, hi, wi]] - max).exp();
                    probs[[ni, ci, hi, wi]] = e;
                    sum += e;
                }
                for ci in 0..c {
                    probs[[ni, ci, hi, wi]] /= sum;
                }
            }
        }
    }
    probs
}

/// softmax的雅可比向量积：dz_c = p_c * (dp_c - Σ_k p_k dp_k)
pub(crate) fn channel_softmax_grad(probs: ArrayView4<f32>, dprobs: ArrayView4<f32>) -> Array4<f32> {
    let (_, c, _, _) = probs.dim();
    Array4::from_shape_fn(probs.dim(), |(ni, ci, hi, wi)| {
        let dot = (0..c)
            .map(|k| probs[[ni, k, hi, wi]] * dprobs[[ni, k, hi, wi]])
            .sum::<f32>();
        probs[[ni, ci, hi, wi]] * (dprobs[[ni, ci, hi, wi]] - dot)
    })
}

#[derive(Debug, Clone, Default)]
pub struct Softmax;

impl Softmax {
    pub(crate) const fn new() -> Self {
        Self
    }
}

impl TraitNode for Softmax {
    fn kind(&self) -> &'static str {
        "Softmax"
    }

    fn min_num_inputs(&self) -> usize {
        1
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        Ok(vec![input_shapes[0]])
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let probs = channel_softmax(inputs[0].view());
        write_output(outputs, 0, &Tensor::from_array(probs))
    }

    fn backward(
        &mut self,
        _inputs: &[&Tensor],
        outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        if !needs[0] {
            return Ok(vec![None]);
        }
        let dy = output_diff(outputs, 0, self.kind())?;
        let dx = channel_softmax_grad(outputs[0].value().view(), dy.view());
        Ok(vec![Some(Tensor::from_array(dx))])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Softmax
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!("softmax({}, Some({name:?}))", inputs[0])
    }
}
