use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, same_shapes, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use rand::rngs::StdRng;

/// 逐元素平方误差`(a - b)^2`，输出与输入同形；通常接在`Loss`节点之前
#[derive(Debug, Clone, Default)]
pub struct SquareError;

impl SquareError {
    pub(crate) const fn new() -> Self {
        Self
    }
}

impl TraitNode for SquareError {
    fn kind(&self) -> &'static str {
        "SquareError"
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
        let result = inputs[0].zip_map(inputs[1], |a, b| (a - b) * (a - b));
        write_output(outputs, 0, &result)
    }

    fn backward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        let diff = output_diff(outputs, 0, self.kind())?;
        // d/da = 2(a-b)·diff，d/db为其相反数
        let grad_a = &(&(inputs[0] - inputs[1]) * 2.) * diff;
        let grad_b = needs[1].then(|| &grad_a * -1.);
        Ok(vec![needs[0].then_some(grad_a), grad_b])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::SquareError
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!("square_error({}, {}, Some({name:?}))", inputs[0], inputs[1])
    }
}
