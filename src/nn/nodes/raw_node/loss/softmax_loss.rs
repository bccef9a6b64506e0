/*
 * @Author       : 老董
 * @Date         : 2026-02-04
 * @Description  : Softmax + 交叉熵损失
 *
 * 输入：
 * - inputs[0]: logits [N, C, H, W]，在通道维C上做softmax（H、W上每个位置各自独立）
 * - inputs[1]: 目标分布（通常是one-hot），与logits同形
 * 输出：
 * - outputs[0]: softmax概率，与logits同形
 * - outputs[1]: 标量损失 `-Σ t·ln(p) / N`
 *
 * 反向：对logits的梯度为`(p - t) / N`，再加上下游经由概率输出传回的梯度（softmax的雅可比向量积）
 */

use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::ops::{channel_softmax, channel_softmax_grad};
use crate::nn::nodes::raw_node::{same_shapes, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{BackwardType, ForwardType, GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use ndarray::Array4;
use rand::rngs::StdRng;

/// 防止`ln(0)`
const MIN_PROB: f32 = 1e-12;

#[derive(Debug, Clone, Default)]
pub struct SoftmaxLoss;

impl SoftmaxLoss {
    pub(crate) const fn new() -> Self {
        Self
    }
}

impl TraitNode for SoftmaxLoss {
    fn kind(&self) -> &'static str {
        "SoftmaxLoss"
    }

    fn min_num_inputs(&self) -> usize {
        2
    }

    fn min_num_outputs(&self) -> usize {
        2
    }

    fn forward_type(&self) -> ForwardType {
        ForwardType::Always
    }

    fn backward_type(&self) -> BackwardType {
        BackwardType::Always
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        let dims = same_shapes(input_shapes, self.kind())?;
        Ok(vec![dims, [1, 1, 1, 1]])
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let (logits, target) = (inputs[0].view(), inputs[1].view());
        let n = logits.dim().0;

        let probs = channel_softmax(logits);

        let cross_entropy = probs
            .iter()
            .zip(target.iter())
            .map(|(&p, &t)| -t * p.max(MIN_PROB).ln())
            .sum::<f32>()
            / n as f32;

        write_output(outputs, 0, &Tensor::from_array(probs))?;
        write_output(outputs, 1, &Tensor::full(cross_entropy, [1, 1, 1, 1]))
    }

    fn backward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        let probs = outputs[0].value();
        let n = probs.dims()[0] as f32;

        let grad_logits = needs[0].then(|| {
            let p = probs.view();
            let t = inputs[1].view();
            let mut grad = Array4::from_shape_fn(p.dim(), |idx| (p[idx] - t[idx]) / n);
            // 概率输出上的下游梯度
            if let Some(dp) = outputs[0].diff() {
                grad += &channel_softmax_grad(p, dp.view());
            }
            Tensor::from_array(grad)
        });
        let grad_target = needs[1].then(|| probs.map(|p| -p.max(MIN_PROB).ln() / n));

        Ok(vec![grad_logits, grad_target])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::SoftmaxLoss
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!("softmax_loss({}, {}, Some({name:?}))", inputs[0], inputs[1])
    }
}
