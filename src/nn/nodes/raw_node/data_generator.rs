use super::TraitNode;
use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::initializer::Initializer;
use crate::nn::terminal::NodeOutput;
use crate::nn::{BackwardType, GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 数据生成节点：每次前向都按其初始化器重新生成输出（如GAN的噪声输入）。
/// 随机源在初始化时从图的随机数生成器派生，之后独立演进。
#[derive(Debug, Clone)]
pub struct DataGenerator {
    initializer: Initializer,
    rng: Option<StdRng>,
}

impl DataGenerator {
    pub(crate) const fn new(initializer: Initializer) -> Self {
        Self {
            initializer,
            rng: None,
        }
    }

    pub fn initializer(&self) -> &Initializer {
        &self.initializer
    }

    pub(crate) fn initializer_mut(&mut self) -> &mut Initializer {
        &mut self.initializer
    }
}

impl TraitNode for DataGenerator {
    fn kind(&self) -> &'static str {
        "DataGenerator"
    }

    fn min_num_inputs(&self) -> usize {
        0
    }

    fn backward_type(&self) -> BackwardType {
        BackwardType::Never
    }

    fn init(&mut self, _input_shapes: &[Shape4], rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        self.rng = Some(StdRng::seed_from_u64(rng.gen()));
        Ok(vec![self.initializer.dims()])
    }

    fn forward(
        &mut self,
        _inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let rng = self.rng.as_mut().ok_or_else(|| {
            GraphError::ComputationError("DataGenerator节点尚未初始化随机源".to_string())
        })?;
        match outputs.first_mut() {
            Some(output) => self.initializer.apply(output.value_mut(), rng),
            None => Err(GraphError::ComputationError(
                "DataGenerator节点没有输出端子".to_string(),
            )),
        }
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::DataGenerator {
            init: self.initializer.kind().clone(),
            dims: self.initializer.dims(),
        }
    }

    fn to_code(&self, _inputs: &[String], name: &str) -> String {
        format!("data_generator({}, Some({name:?}))", self.initializer.to_code())
    }
}
