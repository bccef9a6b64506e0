use super::{route_backward, routed_shape};
use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 随机选择器：每次前向以概率`probability`转发第0路输入，否则转发第1路。
/// 两路输入都会执行；反向只回传给本次被转发的那一路。
#[derive(Debug, Clone)]
pub struct RandomSelector {
    probability: f32,
    rng: Option<StdRng>,
    forwarded: Option<usize>,
}

impl RandomSelector {
    pub(crate) const fn new(probability: f32) -> Self {
        Self {
            probability,
            rng: None,
            forwarded: None,
        }
    }

    pub const fn probability(&self) -> f32 {
        self.probability
    }

    /// 最近一次前向转发的输入
    pub const fn forwarded(&self) -> Option<usize> {
        self.forwarded
    }
}

impl TraitNode for RandomSelector {
    fn kind(&self) -> &'static str {
        "RandomSelector"
    }

    fn min_num_inputs(&self) -> usize {
        2
    }

    fn backward_input_active(&self, slot: usize, _ctx: &PassContext) -> bool {
        self.forwarded == Some(slot)
    }

    fn init(&mut self, input_shapes: &[Shape4], rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        if !(0. ..=1.).contains(&self.probability) {
            return Err(GraphError::InvalidOperation(format!(
                "随机选择器的概率必须在[0, 1]内，得到{}",
                self.probability
            )));
        }
        self.rng = Some(StdRng::seed_from_u64(rng.gen()));
        self.forwarded = None;
        routed_shape(input_shapes, self.kind())
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let rng = self.rng.as_mut().ok_or_else(|| {
            GraphError::ComputationError("随机选择器尚未初始化随机源".to_string())
        })?;
        let slot = if rng.gen::<f32>() < self.probability { 0 } else { 1 };
        self.forwarded = Some(slot);
        write_output(outputs, 0, inputs[slot])
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
        NodeTypeDescriptor::RandomSelector {
            probability: self.probability,
        }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!(
            "random_selector({}, {}, {:?}, Some({name:?}))",
            inputs[0], inputs[1], self.probability
        )
    }
}
