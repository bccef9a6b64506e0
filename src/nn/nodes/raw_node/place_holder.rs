use super::TraitNode;
use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::terminal::NodeOutput;
use crate::nn::{BackwardType, GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use rand::rngs::StdRng;

/// 占位节点：其值由驱动程序在两次传播之间写入（`Session::write_values`）
#[derive(Debug, Clone)]
pub struct PlaceHolder {
    dims: Shape4,
}

impl PlaceHolder {
    pub(crate) const fn new(dims: Shape4) -> Self {
        Self { dims }
    }
}

impl TraitNode for PlaceHolder {
    fn kind(&self) -> &'static str {
        "PlaceHolder"
    }

    fn min_num_inputs(&self) -> usize {
        0
    }

    fn backward_type(&self) -> BackwardType {
        BackwardType::Never
    }

    fn init(&mut self, _input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        Ok(vec![self.dims])
    }

    // 值已由外部写入
    fn forward(
        &mut self,
        _inputs: &[&Tensor],
        _outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        Ok(())
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::PlaceHolder { dims: self.dims }
    }

    fn to_code(&self, _inputs: &[String], name: &str) -> String {
        format!("place_holder(&{:?}, Some({name:?}))", self.dims)
    }
}
