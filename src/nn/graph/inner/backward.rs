/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : Graph 条件反向传播
 *
 * 只有在最近一次前向中执行过的节点参与。按拓扑顺序规划：
 * - 节点“需要梯度”：它是已执行的可训练节点，或它自己会执行反向；
 * - ALWAYS节点总是反向，NEVER节点从不反向，DEPENDS_ON_INPUTS节点当且仅当它本次读取的某个输入来自“需要梯度”的节点时反向。
 * 再按逆拓扑顺序执行：每个节点读取自身输出的梯度，把对各输入的梯度累加到上游输出端子的梯度上。
 * 非参数节点的梯度在每次反向开始时清零，因此同一次前向后的多次反向只会让参数梯度累加。
 */

use super::super::error::GraphError;
use super::super::types::{BackwardType, PassContext};
use super::Graph;
use crate::nn::nodes::TraitNode;
use crate::nn::terminal::NodeOutput;
use crate::nn::NodeId;
use crate::tensor::Tensor;
use std::collections::BTreeSet;

impl Graph {
    /// 执行一次反向传播（基于最近一次前向传播）
    pub fn backward(&mut self) -> Result<(), GraphError> {
        self.check_initialized()?;
        if self.last_forward_pass_id == 0 {
            return Err(GraphError::InvalidOperation(
                "尚未执行过前向传播，无法反向传播".to_string(),
            ));
        }
        let phase = self.forward_phase.clone();
        let ctx = PassContext {
            phase: phase.as_deref(),
            behaviour: phase.as_deref().and_then(|p| self.phases.get(p).copied()),
        };

        let (plan, needs_diff) = self.plan_backward(&ctx)?;
        self.reset_intermediate_diffs();
        let pass_id = self.last_backward_pass_id + 1;
        let order = self.topo_order.clone();
        for id in order.into_iter().rev().filter(|id| plan.contains(id)) {
            self.backward_node(id, pass_id, &needs_diff, &ctx)?;
        }

        self.last_backward_pass_id = pass_id;
        log::debug!(
            "反向传播#{pass_id}：{}/{}个节点执行",
            plan.len(),
            self.nodes.len()
        );
        Ok(())
    }

    /// 清零所有非参数节点输出端子的梯度
    fn reset_intermediate_diffs(&mut self) {
        let Self {
            nodes, terminals, ..
        } = self;
        for (id, outputs) in terminals.iter_mut() {
            if nodes.get(id).is_some_and(|n| !n.is_trainable()) {
                outputs.iter_mut().for_each(NodeOutput::reset_diff);
            }
        }
    }

    /// 返回 (会反向的节点, 需要梯度的节点)
    fn plan_backward(
        &self,
        ctx: &PassContext,
    ) -> Result<(BTreeSet<NodeId>, BTreeSet<NodeId>), GraphError> {
        let forward_pass = self.last_forward_pass_id;
        let mut plan = BTreeSet::new();
        let mut needs_diff = BTreeSet::new();

        for &id in &self.topo_order {
            let node = self.get_node_by_id(id)?;
            if node.last_forward_pass_id() != forward_pass {
                continue;
            }
            let raw = node.raw_node();
            let will_backward = match raw.backward_type() {
                BackwardType::Always => true,
                BackwardType::Never => false,
                BackwardType::DependsOnInputs => {
                    node.inputs().iter().enumerate().any(|(slot, input)| {
                        raw.backward_input_active(slot, ctx)
                            && input.source().is_some_and(|s| needs_diff.contains(&s.node))
                    })
                }
            };
            if will_backward {
                plan.insert(id);
            }
            if will_backward || raw.is_trainable() {
                needs_diff.insert(id);
            }
        }
        Ok((plan, needs_diff))
    }

    fn backward_node(
        &mut self,
        id: NodeId,
        pass_id: u64,
        needs_diff: &BTreeSet<NodeId>,
        ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let Self {
            nodes, terminals, ..
        } = self;
        let node = nodes.get_mut(&id).ok_or(GraphError::NodeIdNotFound(id))?;
        if node.last_backward_pass_id() == pass_id {
            return Ok(());
        }

        let sources = node
            .inputs()
            .iter()
            .enumerate()
            .map(|(slot, input)| {
                input.source().ok_or_else(|| GraphError::UnboundInput {
                    node: node.name().to_string(),
                    slot,
                })
            })
            .collect::<Result<Vec<_>, GraphError>>()?;
        let needs = sources
            .iter()
            .enumerate()
            .map(|(slot, s)| node.raw_node().backward_input_active(slot, ctx) && needs_diff.contains(&s.node))
            .collect::<Vec<bool>>();

        // 1. 计算对各输入的梯度
        let grads = {
            let outputs = terminals.get(&id).ok_or(GraphError::NodeIdNotFound(id))?;
            let inputs = sources
                .iter()
                .map(|s| {
                    terminals
                        .get(&s.node)
                        .and_then(|outs| outs.get(s.index))
                        .map(NodeOutput::value)
                        .ok_or(GraphError::NodeIdNotFound(s.node))
                })
                .collect::<Result<Vec<&Tensor>, GraphError>>()?;
            node.raw_node_mut().backward(&inputs, outputs, &needs, ctx)?
        };

        // 2. 累加到上游输出端子的梯度上
        for (slot, grad) in grads.into_iter().enumerate() {
            let (Some(grad), Some(source)) = (grad, sources.get(slot)) else {
                continue;
            };
            if !needs[slot] {
                continue;
            }
            let target = terminals
                .get_mut(&source.node)
                .and_then(|outs| outs.get_mut(source.index))
                .ok_or(GraphError::NodeIdNotFound(source.node))?;
            if target.dims() != grad.dims() {
                return Err(GraphError::ShapeMismatch {
                    expected: target.dims().to_vec(),
                    got: grad.shape().to_vec(),
                    message: format!("{node}对第{slot}个输入的梯度形状与该输入不一致"),
                });
            }
            target.accumulate_diff(&grad);
        }

        node.mark_backwarded(pass_id);
        log::trace!("反向：{node}");
        Ok(())
    }
}
