/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : Graph 计算图的底层实现
 *
 * 各 impl 块分散在子模块中：
 * - core.rs: 创建、查询、节点登记、相位表
 * - node_builders.rs: 图定义接口（place_holder/variable/conv2d/...）
 * - block.rs: 结构编辑（删除节点、重新绑定输入/求解器/相位）
 * - init.rs: initialize（拓扑排序、形状推断、端子分配）
 * - forward.rs: 条件前向传播
 * - backward.rs: 条件反向传播
 * - solver.rs: 求解器登记、apply_solvers、reset_gradients
 * - control.rs: 复用器/开关/占位节点的控制状态
 * - describe.rs: describe/summary
 * - model_io.rs: save_model/load_model
 * - codegen.rs: to_code
 */

mod backward;
mod block;
mod codegen;
mod control;
mod core;
mod describe;
mod forward;
mod init;
mod model_io;
mod node_builders;
mod solver;

pub use model_io::SaveOptions;

use super::types::PhaseBehaviour;
use crate::nn::nodes::NodeHandle;
use crate::nn::solver::Solver;
use crate::nn::terminal::NodeOutput;
use crate::nn::NodeId;
use rand::rngs::StdRng;
use std::collections::BTreeMap;

/// 计算图：节点的arena。
///
/// 节点以`NodeId`为键保存（`BTreeMap`，迭代顺序即创建顺序）；节点间的边只以
/// `OutputRef`（节点id + 输出序号）的形式存在于各输入端子中，不持有任何引用。
/// 所有输出端子的张量集中保存在`terminals`里，与节点本身分开，
/// 便于执行某节点时同时借用其输出（可变）和上游输出（不可变）。
pub struct Graph {
    pub(in crate::nn::graph) name: String,
    pub(in crate::nn::graph) nodes: BTreeMap<NodeId, NodeHandle>,
    /// 各节点的输出端子；初始化时分配
    pub(in crate::nn::graph) terminals: BTreeMap<NodeId, Vec<NodeOutput>>,
    /// 上游节点 -> (消费者节点, 消费者的输入序号)；初始化时建立
    pub(in crate::nn::graph) consumers: BTreeMap<NodeId, Vec<(NodeId, usize)>>,
    /// 拓扑顺序（每个节点都排在其所有上游之后）；初始化时建立
    pub(in crate::nn::graph) topo_order: Vec<NodeId>,
    pub(in crate::nn::graph) next_id: u64,
    /// 图级别的随机数生成器：所有初始化器与数据生成器的随机源都由它派生
    pub(in crate::nn::graph) rng: StdRng,
    pub(in crate::nn::graph) seed: Option<u64>,
    /// 相位表：名称 -> 行为
    pub(in crate::nn::graph) phases: BTreeMap<String, PhaseBehaviour>,
    /// 新建节点自动归入的相位
    pub(in crate::nn::graph) default_phases: Vec<String>,
    /// 当前激活的相位；None 表示所有节点都有资格执行
    pub(in crate::nn::graph) active_phase: Option<String>,
    /// 最近一次前向传播时激活的相位（反向传播沿用它）
    pub(in crate::nn::graph) forward_phase: Option<String>,
    pub(in crate::nn::graph) solvers: BTreeMap<String, Box<dyn Solver>>,
    pub(in crate::nn::graph) initialized: bool,
    /// 最后一次前向传播的 id
    pub(in crate::nn::graph) last_forward_pass_id: u64,
    /// 最后一次反向传播的 id
    pub(in crate::nn::graph) last_backward_pass_id: u64,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("solvers", &self.solvers.keys().collect::<Vec<_>>())
            .field("phases", &self.phases)
            .field("initialized", &self.initialized)
            .finish()
    }
}
