/*
 * @Author       : 老董
 * @Date         : 2026-02-07
 * @Description  : Graph 初始化：校验输入绑定、拓扑排序、按拓扑顺序逐个节点做形状推断并分配输出端子。
 *                 图的所有配置错误都在这里暴露，之后的前向/反向不会再因结构问题失败。
 */

use super::super::error::GraphError;
use super::super::types::BackwardType;
use super::Graph;
use crate::nn::nodes::{NodeType, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::NodeId;
use crate::tensor::Shape4;
use std::collections::{BTreeMap, BTreeSet};

impl Graph {
    /// 初始化整张图，只能调用一次
    pub fn initialize(&mut self) -> Result<(), GraphError> {
        self.check_not_initialized("重复初始化")?;

        // 1. 输入绑定、输入个数、求解器绑定
        self.validate_structure()?;

        // 2. 拓扑排序 + 消费者表
        let topo_order = self.topological_order()?;
        let mut consumers: BTreeMap<NodeId, Vec<(NodeId, usize)>> = BTreeMap::new();
        for node in self.nodes.values() {
            for (slot, input) in node.inputs().iter().enumerate() {
                if let Some(source) = input.source() {
                    consumers.entry(source.node).or_default().push((node.id(), slot));
                }
            }
        }

        // 3. 按拓扑顺序初始化各节点
        for &id in &topo_order {
            self.initialize_node(id)?;
        }

        self.topo_order = topo_order;
        self.consumers = consumers;
        self.initialized = true;
        log::info!(
            "图{}初始化完成：{}个节点，{}个求解器",
            self.name,
            self.nodes.len(),
            self.solvers.len()
        );
        Ok(())
    }

    fn validate_structure(&self) -> Result<(), GraphError> {
        for node in self.nodes.values() {
            let raw = node.raw_node();
            if node.inputs().len() < raw.min_num_inputs() {
                return Err(GraphError::InvalidOperation(format!(
                    "{node}至少需要{}个输入，实际只有{}个",
                    raw.min_num_inputs(),
                    node.inputs().len()
                )));
            }
            for (slot, input) in node.inputs().iter().enumerate() {
                let source = input.source().ok_or_else(|| GraphError::UnboundInput {
                    node: node.name().to_string(),
                    slot,
                })?;
                let producer = self.get_node_by_id(source.node)?;
                if source.index >= producer.raw_node().min_num_outputs() {
                    return Err(GraphError::InvalidOperation(format!(
                        "{node}的第{slot}个输入绑定到了{producer}不存在的第{}个输出",
                        source.index
                    )));
                }
            }
            if let NodeType::Variable(var) = raw {
                if let Some(solver) = var.solver() {
                    if !self.solvers.contains_key(solver) {
                        return Err(GraphError::SolverNotFound(format!(
                            "{node}绑定的求解器{solver}不存在"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Kahn算法；同时可处理的节点按id从小到大排列，保证顺序确定
    fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        let mut in_degree: BTreeMap<NodeId, usize> = self.nodes.keys().map(|&id| (id, 0)).collect();
        let mut downstream: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for node in self.nodes.values() {
            for source in node.inputs().iter().filter_map(|i| i.source()) {
                *in_degree.entry(node.id()).or_default() += 1;
                downstream.entry(source.node).or_default().push(node.id());
            }
        }

        let mut ready: BTreeSet<NodeId> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = ready.pop_first() {
            order.push(id);
            for next in downstream.get(&id).into_iter().flatten() {
                if let Some(d) = in_degree.get_mut(next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.insert(*next);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(GraphError::InvalidOperation(format!(
                "图{}中存在环，无法确定执行顺序",
                self.name
            )));
        }
        Ok(order)
    }

    fn initialize_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        let Self {
            nodes,
            terminals,
            rng,
            ..
        } = self;
        let node = nodes.get_mut(&id).ok_or(GraphError::NodeIdNotFound(id))?;

        let input_shapes = node
            .inputs()
            .iter()
            .enumerate()
            .map(|(slot, input)| {
                let source = input.source().ok_or_else(|| GraphError::UnboundInput {
                    node: node.name().to_string(),
                    slot,
                })?;
                terminals
                    .get(&source.node)
                    .and_then(|outputs| outputs.get(source.index))
                    .map(NodeOutput::dims)
                    .ok_or(GraphError::NodeIdNotFound(source.node))
            })
            .collect::<Result<Vec<Shape4>, GraphError>>()?;

        let output_dims = node.raw_node_mut().init(&input_shapes, rng)?;
        let raw = node.raw_node();
        if output_dims.len() < raw.min_num_outputs() {
            return Err(GraphError::ComputationError(format!(
                "{node}推断出{}个输出，少于声明的{}个",
                output_dims.len(),
                raw.min_num_outputs()
            )));
        }

        // 参与反向的节点与可训练节点才分配梯度缓冲
        let with_diff = raw.backward_type() != BackwardType::Never || raw.is_trainable();
        let mut outputs = output_dims
            .iter()
            .map(|&dims| NodeOutput::allocate(dims, with_diff))
            .collect::<Vec<_>>();
        node.raw_node_mut().init_outputs(&mut outputs, rng)?;

        log::info!("初始化{node}：输出形状{output_dims:?}");
        terminals.insert(id, outputs);
        Ok(())
    }
}
