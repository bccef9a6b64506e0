/*
 * @Author       : 老董
 * @Date         : 2026-02-04
 * @Description  : 标量损失节点：把误差张量归约为一个数，并乘以可选的系数输入。
 *                 它是反向传播的起点：前向、反向都是ALWAYS，反向时直接以系数作为种子梯度，
 *                 而不读取自身输出的梯度。
 */

use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{BackwardType, ForwardType, GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// 误差的归约方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LossReduction {
    #[default]
    Avg,
    Sum,
}

#[derive(Debug, Clone)]
pub struct Loss {
    reduction: LossReduction,
    has_coef: bool,
}

impl Loss {
    pub(crate) const fn new(reduction: LossReduction, has_coef: bool) -> Self {
        Self {
            reduction,
            has_coef,
        }
    }

    pub const fn reduction(&self) -> LossReduction {
        self.reduction
    }

    pub const fn has_coef(&self) -> bool {
        self.has_coef
    }

    fn scale(&self, size: usize) -> f32 {
        match self.reduction {
            LossReduction::Avg => 1. / size as f32,
            LossReduction::Sum => 1.,
        }
    }

    fn coef(&self, inputs: &[&Tensor]) -> f32 {
        match inputs.get(1) {
            Some(coef) if self.has_coef => coef.number().unwrap_or(1.),
            _ => 1.,
        }
    }
}

impl TraitNode for Loss {
    fn kind(&self) -> &'static str {
        "Loss"
    }

    fn min_num_inputs(&self) -> usize {
        if self.has_coef {
            2
        } else {
            1
        }
    }

    fn forward_type(&self) -> ForwardType {
        ForwardType::Always
    }

    fn backward_type(&self) -> BackwardType {
        BackwardType::Always
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        if self.has_coef && input_shapes[1] != [1, 1, 1, 1] {
            return Err(GraphError::ShapeMismatch {
                expected: vec![1, 1, 1, 1],
                got: input_shapes[1].to_vec(),
                message: "Loss节点的系数输入必须是标量".to_string(),
            });
        }
        Ok(vec![[1, 1, 1, 1]])
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let err = inputs[0];
        let value = self.coef(inputs) * err.sum() * self.scale(err.size());
        write_output(outputs, 0, &Tensor::full(value, [1, 1, 1, 1]))
    }

    fn backward(
        &mut self,
        inputs: &[&Tensor],
        _outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        let err = inputs[0];
        let scale = self.scale(err.size());
        let mut grads = vec![needs[0].then(|| Tensor::full(self.coef(inputs) * scale, err.dims()))];
        if self.has_coef {
            let reduced = err.sum() * scale;
            grads.push(needs[1].then(|| Tensor::full(reduced, [1, 1, 1, 1])));
        }
        Ok(grads)
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Loss {
            reduction: self.reduction,
            coef: self.has_coef,
        }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        let coef = match inputs.get(1) {
            Some(coef) if self.has_coef => format!("Some({coef})"),
            _ => "None".to_string(),
        };
        format!(
            "loss({}, {coef}, LossReduction::{:?}, Some({name:?}))",
            inputs[0], self.reduction
        )
    }
}
