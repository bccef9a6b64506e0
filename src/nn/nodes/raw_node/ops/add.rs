use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, same_shapes, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use rand::rngs::StdRng;

/// 加权相加：`alpha*a + beta*b`。减法即`alpha=1, beta=-1`。
#[derive(Debug, Clone)]
pub struct Add {
    alpha: f32,
    beta: f32,
}

impl Add {
    pub(crate) const fn new(alpha: f32, beta: f32) -> Self {
        Self { alpha, beta }
    }

    pub const fn coefficients(&self) -> (f32, f32) {
        (self.alpha, self.beta)
    }
}

impl TraitNode for Add {
    fn kind(&self) -> &'static str {
        if self.alpha == 1. && self.beta == -1. {
            "Subtract"
        } else {
            "Add"
        }
    }

    fn min_num_inputs(&self) -> usize {
        2
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        Ok(vec![same_shapes(input_shapes, self.kind())?])
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let result = inputs[0] * self.alpha + &(inputs[1] * self.beta);
        write_output(outputs, 0, &result)
    }

    fn backward(
        &mut self,
        _inputs: &[&Tensor],
        outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        let diff = output_diff(outputs, 0, self.kind())?;
        Ok(vec![
            needs[0].then(|| diff * self.alpha),
            needs[1].then(|| diff * self.beta),
        ])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Add {
            alpha: self.alpha,
            beta: self.beta,
        }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        match (self.alpha, self.beta) {
            (a, b) if a == 1. && b == 1. => {
                format!("add({}, {}, Some({name:?}))", inputs[0], inputs[1])
            }
            (a, b) if a == 1. && b == -1. => {
                format!("subtract({}, {}, Some({name:?}))", inputs[0], inputs[1])
            }
            (a, b) => format!(
                "add_weighted({}, {a:?}, {}, {b:?}, Some({name:?}))",
                inputs[0], inputs[1]
            ),
        }
    }
}
