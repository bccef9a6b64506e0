/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : Graph 核心操作：创建、查询、节点登记、相位表
 */

use super::super::error::GraphError;
use super::super::types::PhaseBehaviour;
use super::Graph;
use crate::nn::nodes::{NodeHandle, NodeType, TraitNode};
use crate::nn::terminal::{NodeInput, NodeOutput};
use crate::nn::{NodeId, OutputRef};
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;

impl Graph {
    // ========== 创建 ==========

    pub fn new() -> Self {
        Self::with_name("default_graph")
    }

    /// 创建一个带固定种子的计算图（确保可重复性）
    pub fn new_with_seed(seed: u64) -> Self {
        Self::with_name_and_seed("default_graph", seed)
    }

    /// 创建一个带名称和固定种子的计算图
    pub fn with_name_and_seed(name: &str, seed: u64) -> Self {
        Self::build(name, StdRng::seed_from_u64(seed), Some(seed))
    }

    /// 随机源取自系统熵（不可重复）
    pub fn with_name(name: &str) -> Self {
        Self::build(name, StdRng::from_entropy(), None)
    }

    fn build(name: &str, rng: StdRng, seed: Option<u64>) -> Self {
        Self {
            name: name.to_string(),
            nodes: BTreeMap::new(),
            terminals: BTreeMap::new(),
            consumers: BTreeMap::new(),
            topo_order: Vec::new(),
            next_id: 0,
            rng,
            seed,
            phases: BTreeMap::new(),
            default_phases: Vec::new(),
            active_phase: None,
            forward_phase: None,
            solvers: BTreeMap::new(),
            initialized: false,
            last_forward_pass_id: 0,
            last_backward_pass_id: 0,
        }
    }

    // ========== 基础访问器 ==========

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// 设置/重置图的随机种子；只能在初始化之前调用
    pub fn set_seed(&mut self, seed: u64) -> Result<(), GraphError> {
        self.check_not_initialized("设置随机种子")?;
        self.rng = StdRng::seed_from_u64(seed);
        self.seed = Some(seed);
        Ok(())
    }

    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub const fn last_forward_pass_id(&self) -> u64 {
        self.last_forward_pass_id
    }

    pub const fn last_backward_pass_id(&self) -> u64 {
        self.last_backward_pass_id
    }

    /// 按创建顺序返回所有节点id
    pub fn nodes(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_node_by_id(&self, id: NodeId) -> Result<&NodeHandle, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeIdNotFound(id))
    }

    pub(in crate::nn) fn get_node_by_id_mut(&mut self, id: NodeId) -> Result<&mut NodeHandle, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeIdNotFound(id))
    }

    /// 按名称查找节点
    pub fn get_node(&self, name: &str) -> Result<&NodeHandle, GraphError> {
        self.nodes
            .values()
            .find(|node| node.name() == name)
            .ok_or_else(|| GraphError::NodeNotFound(name.to_string()))
    }

    pub fn node_id(&self, name: &str) -> Result<NodeId, GraphError> {
        Ok(self.get_node(name)?.id())
    }

    /// 按名称取节点第`index`个输出的句柄
    pub fn output(&self, name: &str, index: usize) -> Result<OutputRef, GraphError> {
        let node = self.get_node(name)?;
        if index >= node.raw_node().min_num_outputs() {
            return Err(GraphError::InvalidOperation(format!(
                "{node}没有第{index}个输出"
            )));
        }
        Ok(OutputRef::new(node.id(), index))
    }

    fn terminal(&self, output: OutputRef) -> Result<&NodeOutput, GraphError> {
        self.check_initialized()?;
        self.terminals
            .get(&output.node)
            .ok_or(GraphError::NodeIdNotFound(output.node))?
            .get(output.index)
            .ok_or_else(|| {
                GraphError::InvalidOperation(format!(
                    "节点{}没有第{}个输出",
                    output.node, output.index
                ))
            })
    }

    pub(in crate::nn::graph) fn terminal_mut(&mut self, output: OutputRef) -> Result<&mut NodeOutput, GraphError> {
        self.check_initialized()?;
        self.terminals
            .get_mut(&output.node)
            .ok_or(GraphError::NodeIdNotFound(output.node))?
            .get_mut(output.index)
            .ok_or_else(|| {
                GraphError::InvalidOperation(format!(
                    "节点{}没有第{}个输出",
                    output.node, output.index
                ))
            })
    }

    /// 输出端子的值（需已初始化）
    pub fn value(&self, output: OutputRef) -> Result<&Tensor, GraphError> {
        Ok(self.terminal(output)?.value())
    }

    /// 输出端子的梯度（需已初始化）；不参与反向传播的端子没有梯度，返回None
    pub fn diff(&self, output: OutputRef) -> Result<Option<&Tensor>, GraphError> {
        Ok(self.terminal(output)?.diff())
    }

    /// 按名称取节点第0个输出的值
    pub fn value_of(&self, name: &str) -> Result<&Tensor, GraphError> {
        self.value(self.output(name, 0)?)
    }

    /// 按名称取节点第0个输出的梯度
    pub fn diff_of(&self, name: &str) -> Result<Option<&Tensor>, GraphError> {
        self.diff(self.output(name, 0)?)
    }

    /// 所有可训练节点（Variable）
    pub fn get_trainable_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.is_trainable())
            .map(NodeHandle::id)
            .collect()
    }

    /// 最近一次前向中执行过的损失节点的值：(节点名, 标量值)
    pub fn loss_values(&self) -> Vec<(String, f32)> {
        self.nodes
            .values()
            .filter(|node| {
                self.last_forward_pass_id > 0
                    && node.last_forward_pass_id() == self.last_forward_pass_id
            })
            .filter_map(|node| {
                let index = match node.raw_node() {
                    NodeType::Loss(_) => 0,
                    NodeType::SoftmaxLoss(_) => 1,
                    _ => return None,
                };
                let value = self.terminals.get(&node.id())?.get(index)?.value().number()?;
                Some((node.name().to_string(), value))
            })
            .collect()
    }

    // ========== 状态检查 ==========

    pub(in crate::nn::graph) fn check_initialized(&self) -> Result<(), GraphError> {
        if self.initialized {
            Ok(())
        } else {
            Err(GraphError::NotInitialized)
        }
    }

    pub(in crate::nn::graph) fn check_not_initialized(&self, action: &str) -> Result<(), GraphError> {
        if self.initialized {
            log::error!("图{}已初始化，无法{action}", self.name);
            Err(GraphError::AlreadyInitialized)
        } else {
            Ok(())
        }
    }

    // ========== ID/名称生成 ==========

    pub(in crate::nn::graph) fn generate_valid_node_id(&mut self) -> NodeId {
        // 先递增再返回，所以第一个节点 ID 是 1
        self.next_id += 1;
        NodeId(self.next_id)
    }

    pub(in crate::nn::graph) fn check_duplicate_node_name(&self, name: &str) -> Result<(), GraphError> {
        if self.nodes.values().any(|node| node.name() == name) {
            return Err(GraphError::DuplicateNodeName(format!(
                "节点{}在图{}中重复",
                name,
                self.name()
            )));
        }
        Ok(())
    }

    pub(in crate::nn::graph) fn generate_valid_new_node_name(
        &self,
        base_name: &str,
        node_type: &str,
    ) -> Result<String, GraphError> {
        if !base_name.is_empty() {
            self.check_duplicate_node_name(base_name)?;
            return Ok(base_name.to_string());
        }

        let mut counter = 1;
        loop {
            let name = format!("{node_type}_{counter}");
            if self.check_duplicate_node_name(&name).is_ok() {
                return Ok(name);
            }
            counter += 1;
        }
    }

    // ========== 节点登记 ==========

    /// 登记一个新节点：输入全部绑定到给定的上游输出，相位取当前的默认相位
    pub(in crate::nn::graph) fn add_node<T: Into<NodeType>>(
        &mut self,
        raw_node: T,
        inputs: &[OutputRef],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        for input in inputs {
            let producer = self.get_node_by_id(input.node)?;
            if input.index >= producer.raw_node().min_num_outputs() {
                return Err(GraphError::InvalidOperation(format!(
                    "{producer}没有第{}个输出",
                    input.index
                )));
            }
        }
        let inputs = inputs.iter().copied().map(NodeInput::bound).collect();
        let phases = self.default_phases.clone();
        self.insert_node(raw_node.into(), inputs, phases, name)
    }

    /// 登记节点的底层实现（模型加载时直接使用，输入可以未绑定）
    pub(in crate::nn::graph) fn insert_node(
        &mut self,
        raw_node: NodeType,
        inputs: Vec<NodeInput>,
        phases: Vec<String>,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.check_not_initialized("添加节点")?;
        for phase in &phases {
            self.check_phase(phase)?;
        }
        let node_name = self.generate_valid_new_node_name(name.unwrap_or(""), raw_node.kind())?;
        let node_id = self.generate_valid_node_id();
        let node = NodeHandle::new(node_id, &node_name, inputs, phases, raw_node);
        log::trace!("登记{node}");
        self.nodes.insert(node_id, node);
        Ok(node_id)
    }

    // ========== 相位 ==========

    /// 声明一个相位
    pub fn define_phase(&mut self, name: &str, behaviour: PhaseBehaviour) -> Result<(), GraphError> {
        self.check_not_initialized("声明相位")?;
        if name.is_empty() {
            return Err(GraphError::InvalidOperation("相位名不能为空".to_string()));
        }
        self.phases.insert(name.to_string(), behaviour);
        Ok(())
    }

    pub fn phases(&self) -> &BTreeMap<String, PhaseBehaviour> {
        &self.phases
    }

    pub fn phase_behaviour(&self, name: &str) -> Result<PhaseBehaviour, GraphError> {
        self.phases
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::PhaseNotFound(name.to_string()))
    }

    pub(in crate::nn::graph) fn check_phase(&self, name: &str) -> Result<(), GraphError> {
        self.phase_behaviour(name).map(|_| ())
    }

    /// 此后新建的节点都自动归入这些相位（传空切片则恢复为“所有相位”）
    pub fn set_default_phases(&mut self, phases: &[&str]) -> Result<(), GraphError> {
        for phase in phases {
            self.check_phase(phase)?;
        }
        self.default_phases = phases.iter().map(|p| p.to_string()).collect();
        Ok(())
    }

    /// 激活一个相位（None 表示不做相位过滤）；在两次传播之间调用
    pub fn set_active_phase(&mut self, phase: Option<&str>) -> Result<(), GraphError> {
        if let Some(phase) = phase {
            self.check_phase(phase)?;
        }
        self.active_phase = phase.map(str::to_string);
        Ok(())
    }

    pub fn active_phase(&self) -> Option<&str> {
        self.active_phase.as_deref()
    }
}
