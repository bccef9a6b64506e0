use super::raw_node::{NodeType, TraitNode};
use crate::nn::terminal::NodeInput;
use serde::{Deserialize, Serialize};

/// 节点在图中的唯一标识（由图按创建顺序分配，从1开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 图中的一个节点：原始运算 + 图的簿记信息。
/// 输出端子的张量不在这里，而由图统一保管（见`Graph::terminals`），
/// 这样执行某节点时可以可变地借用它自己的输出、同时不可变地借用上游的输出。
#[derive(Debug, Clone)]
pub struct NodeHandle {
    id: NodeId,
    name: String,
    /// 节点所属相位；为空表示所有相位
    phases: Vec<String>,
    inputs: Vec<NodeInput>,
    raw_node: NodeType,
    last_forward_pass_id: u64,
    last_backward_pass_id: u64,
    forward_count: u64,
    backward_count: u64,
}

impl NodeHandle {
    pub(in crate::nn) fn new<T: Into<NodeType>>(
        id: NodeId,
        name: &str,
        inputs: Vec<NodeInput>,
        phases: Vec<String>,
        raw_node: T,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            phases,
            inputs,
            raw_node: raw_node.into(),
            last_forward_pass_id: 0,
            last_backward_pass_id: 0,
            forward_count: 0,
            backward_count: 0,
        }
    }

    pub const fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &'static str {
        self.raw_node.kind()
    }

    pub fn phases(&self) -> &[String] {
        &self.phases
    }

    pub(in crate::nn) fn add_phase(&mut self, phase: &str) {
        if !self.phases.iter().any(|p| p == phase) {
            self.phases.push(phase.to_string());
        }
    }

    /// 本节点是否有资格在`phase`下执行：未声明相位的节点、或没有激活相位时，总是有资格
    pub fn includes_phase(&self, phase: Option<&str>) -> bool {
        match phase {
            None => true,
            Some(phase) => self.phases.is_empty() || self.phases.iter().any(|p| p == phase),
        }
    }

    pub fn inputs(&self) -> &[NodeInput] {
        &self.inputs
    }

    pub(in crate::nn) fn inputs_mut(&mut self) -> &mut [NodeInput] {
        &mut self.inputs
    }

    pub fn raw_node(&self) -> &NodeType {
        &self.raw_node
    }

    pub(in crate::nn) fn raw_node_mut(&mut self) -> &mut NodeType {
        &mut self.raw_node
    }

    pub fn is_trainable(&self) -> bool {
        self.raw_node.is_trainable()
    }

    pub const fn last_forward_pass_id(&self) -> u64 {
        self.last_forward_pass_id
    }

    pub const fn last_backward_pass_id(&self) -> u64 {
        self.last_backward_pass_id
    }

    pub(in crate::nn) fn mark_forwarded(&mut self, pass_id: u64) {
        self.last_forward_pass_id = pass_id;
        self.forward_count += 1;
    }

    pub(in crate::nn) fn mark_backwarded(&mut self, pass_id: u64) {
        self.last_backward_pass_id = pass_id;
        self.backward_count += 1;
    }

    /// 自图创建以来本节点执行前向的总次数
    pub const fn forward_count(&self) -> u64 {
        self.forward_count
    }

    /// 自图创建以来本节点执行反向的总次数
    pub const fn backward_count(&self) -> u64 {
        self.backward_count
    }
}

impl std::fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "节点[{}]({}{})", self.name, self.kind(), self.id)
    }
}
