use super::{route_backward, routed_shape};
use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use rand::rngs::StdRng;

/// 开关：打开时原样转发输入，关闭时本节点不参与前向
#[derive(Debug, Clone)]
pub struct Switch {
    enabled: bool,
}

impl Switch {
    pub(crate) const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl TraitNode for Switch {
    fn kind(&self) -> &'static str {
        "Switch"
    }

    fn min_num_inputs(&self) -> usize {
        1
    }

    fn is_active(&self, _ctx: &PassContext) -> bool {
        self.enabled
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        routed_shape(input_shapes, self.kind())
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        write_output(outputs, 0, inputs[0])
    }

    fn backward(
        &mut self,
        _inputs: &[&Tensor],
        outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        route_backward(outputs, Some(0), needs, self.kind())
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Switch {
            enabled: self.enabled,
        }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!("switch({}, Some({name:?}))", inputs[0])
    }
}
