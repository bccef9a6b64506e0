use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// 逐元素的一元运算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementwiseOp {
    Square,
    Abs,
    /// 自然对数
    Log,
}

#[derive(Debug, Clone)]
pub struct Elementwise {
    op: ElementwiseOp,
}

impl Elementwise {
    pub(crate) const fn new(op: ElementwiseOp) -> Self {
        Self { op }
    }

    pub const fn op(&self) -> ElementwiseOp {
        self.op
    }
}

impl TraitNode for Elementwise {
    fn kind(&self) -> &'static str {
        match self.op {
            ElementwiseOp::Square => "Square",
            ElementwiseOp::Abs => "Abs",
            ElementwiseOp::Log => "Log",
        }
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
        let result = match self.op {
            ElementwiseOp::Square => inputs[0].map(|x| x * x),
            ElementwiseOp::Abs => inputs[0].map(f32::abs),
            ElementwiseOp::Log => inputs[0].map(f32::ln),
        };
        write_output(outputs, 0, &result)
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
        let diff = output_diff(outputs, 0, self.kind())?;
        let x = inputs[0];
        let grad = match self.op {
            ElementwiseOp::Square => x.zip_map(diff, |x, d| 2. * x * d),
            // |x|在0处取次梯度0
            ElementwiseOp::Abs => x.zip_map(diff, |x, d| {
                if x > 0. {
                    d
                } else if x < 0. {
                    -d
                } else {
                    0.
                }
            }),
            ElementwiseOp::Log => x.zip_map(diff, |x, d| d / x),
        };
        Ok(vec![Some(grad)])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Elementwise { op: self.op }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        let method = match self.op {
            ElementwiseOp::Square => "square",
            ElementwiseOp::Abs => "abs",
            ElementwiseOp::Log => "log",
        };
        format!("{method}({}, Some({name:?}))", inputs[0])
    }
}
