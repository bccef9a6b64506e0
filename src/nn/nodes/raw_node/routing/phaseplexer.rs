use super::{route_backward, routed_shape};
use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use rand::rngs::StdRng;

/// 相位复用器：第i路输入只在相位`phases[i]`下被选中。
/// 没有激活相位时选第0路；激活的相位不在列表中时本节点不参与前向。
#[derive(Debug, Clone)]
pub struct Phaseplexer {
    phases: Vec<String>,
    /// 最近一次前向所在相位选中的输入；反向按它回传梯度
    forwarded: Option<usize>,
}

impl Phaseplexer {
    pub(crate) fn new(phases: Vec<String>) -> Self {
        Self {
            phases,
            forwarded: None,
        }
    }

    pub fn phases(&self) -> &[String] {
        &self.phases
    }

    fn selected_slot(&self, ctx: &PassContext) -> Option<usize> {
        match ctx.phase {
            None => (!self.phases.is_empty()).then_some(0),
            Some(phase) => self.phases.iter().position(|p| p == phase),
        }
    }
}

impl TraitNode for Phaseplexer {
    fn kind(&self) -> &'static str {
        "Phaseplexer"
    }

    fn min_num_inputs(&self) -> usize {
        self.phases.len()
    }

    fn is_active(&self, ctx: &PassContext) -> bool {
        self.selected_slot(ctx).is_some()
    }

    fn input_active(&self, slot: usize, ctx: &PassContext) -> bool {
        self.selected_slot(ctx) == Some(slot)
    }

    fn backward_input_active(&self, slot: usize, _ctx: &PassContext) -> bool {
        self.forwarded == Some(slot)
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        if self.phases.len() < 2 {
            return Err(GraphError::InvalidOperation(format!(
                "相位复用器至少需要2路输入，得到{}",
                self.phases.len()
            )));
        }
        routed_shape(input_shapes, self.kind())
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        ctx: &PassContext,
    ) -> Result<(), GraphError> {
        self.forwarded = self.selected_slot(ctx);
        match self.forwarded {
            Some(slot) => write_output(outputs, 0, inputs[slot]),
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
        NodeTypeDescriptor::Phaseplexer {
            phases: self.phases.clone(),
        }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        let pairs = inputs
            .iter()
            .zip(&self.phases)
            .map(|(input, phase)| format!("({input}, {phase:?})"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("phaseplexer(&[{pairs}], Some({name:?}))")
    }
}
