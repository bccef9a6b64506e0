/*
 * @Author       : 老董
 * @Date         : 2026-02-06
 * @Description  : 求解器基础trait与可序列化的描述
 */

use super::{
    AdadeltaParams, AdadeltaSolver, AdamParams, AdamSolver, GainParams, GainSolver, SgdParams,
    SgdSolver,
};
use crate::nn::{GraphError, NodeId};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// 求解器核心 trait
///
/// 图在`apply_solvers`时对每个被选中的求解器先调用一次`begin_step`，
/// 再对每个绑定到它的参数调用一次`update`：
/// ```ignore
/// session.forward()?;
/// session.backward()?;
/// session.apply_solvers(Some(&["d_adam"]))?; // ← 只更新绑定到d_adam的参数
/// session.reset_gradients();
/// ```
pub trait Solver: std::fmt::Debug {
    /// 求解器名（即参数绑定所用的组名）
    fn name(&self) -> &str;

    /// 每次更新步开始时调用（如Adam递增时间步）
    fn begin_step(&mut self) {}

    /// 用累积的梯度`diff`原地更新参数`value`；`id`用于索引该参数的辅助状态
    fn update(&mut self, id: NodeId, value: &mut Tensor, diff: &Tensor) -> Result<(), GraphError>;

    /// 清空所有辅助状态（动量、矩估计等）
    fn reset(&mut self);

    /// 学习率；没有显式学习率的规则（Adadelta）返回None
    fn learning_rate(&self) -> Option<f32>;

    fn descriptor(&self) -> SolverDescriptor;

    /// 渲染为图定义接口的一次调用（不含`graph.`前缀）
    fn to_code(&self) -> String;
}

/// 求解器的可序列化描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverDescriptor {
    pub name: String,
    pub kind: SolverKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SolverKind {
    Sgd(SgdParams),
    Gain(GainParams),
    Adam(AdamParams),
    Adadelta(AdadeltaParams),
}

impl SolverDescriptor {
    /// 按描述重建一个全新（无辅助状态）的求解器
    pub fn build(&self) -> Box<dyn Solver> {
        match self.kind {
            SolverKind::Sgd(params) => Box::new(SgdSolver::new(&self.name, params)),
            SolverKind::Gain(params) => Box::new(GainSolver::new(&self.name, params)),
            SolverKind::Adam(params) => Box::new(AdamSolver::new(&self.name, params)),
            SolverKind::Adadelta(params) => Box::new(AdadeltaSolver::new(&self.name, params)),
        }
    }
}

/// 参数值与梯度形状必须一致
pub(super) fn check_same_shape(name: &str, value: &Tensor, diff: &Tensor) -> Result<(), GraphError> {
    if value.is_same_shape(diff) {
        return Ok(());
    }
    Err(GraphError::ShapeMismatch {
        expected: value.shape().to_vec(),
        got: diff.shape().to_vec(),
        message: format!("求解器{name}收到的梯度与参数形状不一致"),
    })
}
