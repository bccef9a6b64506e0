use super::{route_backward, routed_shape};
use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use rand::rngs::StdRng;

/// 复用器：把选中的那一路输入原样输出。
/// 未选中任何输入（`selected == None`）时本节点不参与前向，其只为它服务的上游分支也随之跳过。
#[derive(Debug, Clone)]
pub struct Multiplexer {
    num_inputs: usize,
    selected: Option<usize>,
    /// 最近一次前向实际转发的输入；反向按它回传梯度
    forwarded: Option<usize>,
}

impl Multiplexer {
    pub(crate) const fn new(num_inputs: usize, selected: Option<usize>) -> Self {
        Self {
            num_inputs,
            selected,
            forwarded: None,
        }
    }

    pub const fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub const fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub(crate) fn select(&mut self, selected: Option<usize>) -> Result<(), GraphError> {
        if let Some(index) = selected {
            if index >= self.num_inputs {
                return Err(GraphError::InvalidOperation(format!(
                    "复用器只有{}路输入，无法选中第{index}路",
                    self.num_inputs
                )));
            }
        }
        self.selected = selected;
        Ok(())
    }
}

impl TraitNode for Multiplexer {
    fn kind(&self) -> &'static str {
        "Multiplexer"
    }

    fn min_num_inputs(&self) -> usize {
        self.num_inputs
    }

    fn is_active(&self, _ctx: &PassContext) -> bool {
        self.selected.is_some()
    }

    fn input_active(&self, slot: usize, _ctx: &PassContext) -> bool {
        self.selected == Some(slot)
    }

    fn backward_input_active(&self, slot: usize, _ctx: &PassContext) -> bool {
        self.forwarded == Some(slot)
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        if self.num_inputs < 2 {
            return Err(GraphError::InvalidOperation(format!(
                "复用器至少需要2路输入，得到{}",
                self.num_inputs
            )));
        }
        routed_shape(input_shapes, self.kind())
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        self.forwarded = self.selected;
        match self.selected {
            Some(index) => write_output(outputs, 0, inputs[index]),
            None => Ok(()),
        }
    }

    fn backward(
        &mut self,
        _inputs: &[&Tensor],
        outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        route_backward(outputs, self.forwarded, needs, self.kind())
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Multiplexer {
            selected: self.selected,
        }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!("multiplexer(&[{}], Some({name:?}))", inputs.join(", "))
    }
}
