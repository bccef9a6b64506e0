use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{same_shapes, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{BackwardType, GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use rand::rngs::StdRng;

/// 逐元素比较：相等处为1.0，否则为0.0。常与`argmax`、`reduce_mean`组合计算准确率。
#[derive(Debug, Clone, Default)]
pub struct Equal;

impl Equal {
    pub(crate) const fn new() -> Self {
        Self
    }
}

impl TraitNode for Equal {
    fn kind(&self) -> &'static str {
        "Equal"
    }

    fn min_num_inputs(&self) -> usize {
        2
    }

    fn backward_type(&self) -> BackwardType {
        BackwardType::Never
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
        let result = inputs[0].zip_map(inputs[1], |a, b| if a == b { 1. } else { 0. });
        write_output(outputs, 0, &result)
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Equal
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!("equal({}, {}, Some({name:?}))", inputs[0], inputs[1])
    }
}
