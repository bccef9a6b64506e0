/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 可训练参数节点。值由初始化器给出，之后只被其绑定的求解器修改；
 *                 梯度由下游反向传播累加，跨多次反向保留，直到`reset_gradients`。
 */

use super::TraitNode;
use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::initializer::Initializer;
use crate::nn::terminal::NodeOutput;
use crate::nn::{BackwardType, GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use rand::rngs::StdRng;

#[derive(Debug, Clone)]
pub struct Variable {
    initializer: Initializer,
    /// 绑定的求解器名；None表示不被任何求解器更新
    solver: Option<String>,
}

impl Variable {
    pub(crate) fn new(initializer: Initializer, solver: Option<&str>) -> Self {
        Self {
            initializer,
            solver: solver.map(str::to_string),
        }
    }

    pub fn initializer(&self) -> &Initializer {
        &self.initializer
    }

    pub(crate) fn initializer_mut(&mut self) -> &mut Initializer {
        &mut self.initializer
    }

    pub fn solver(&self) -> Option<&str> {
        self.solver.as_deref()
    }

    pub(crate) fn set_solver(&mut self, solver: Option<&str>) {
        self.solver = solver.map(str::to_string);
    }
}

impl TraitNode for Variable {
    fn kind(&self) -> &'static str {
        "Variable"
    }

    fn min_num_inputs(&self) -> usize {
        0
    }

    // 自身不向上游传播，但会收集下游传来的梯度
    fn backward_type(&self) -> BackwardType {
        BackwardType::Never
    }

    fn is_trainable(&self) -> bool {
        true
    }

    fn init(&mut self, _input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        Ok(vec![self.initializer.dims()])
    }

    /// 初值只生成一次并缓存在初始化器里，保存模型时可以连同初始内容一起写出
    fn init_outputs(&mut self, outputs: &mut [NodeOutput], rng: &mut StdRng) -> Result<(), GraphError> {
        if self.initializer.content().is_none() {
            self.initializer.init(rng);
        }
        match outputs.first_mut() {
            Some(output) => self.initializer.apply(output.value_mut(), rng),
            None => Err(GraphError::ComputationError("Variable节点没有输出端子".to_string())),
        }
    }

    fn forward(
        &mut self,
        _inputs: &[&Tensor],
        _outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        Ok(())
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Variable {
            init: self.initializer.kind().clone(),
            dims: self.initializer.dims(),
            solver: self.solver.clone(),
        }
    }

    fn to_code(&self, _inputs: &[String], name: &str) -> String {
        format!(
            "variable({}, {:?}, Some({name:?}))",
            self.initializer.to_code(),
            self.solver.as_deref()
        )
    }
}
