/*
 * @Author       : 老董
 * @Date         : 2026-02-07
 * @Description  : Graph 条件前向传播
 *
 * 一次前向分两步：
 * 1. 规划：先按拓扑顺序找出可执行的节点（属于当前相位、控制状态允许、本次读取的上游都可执行）；
 *    再按逆拓扑顺序决定其中哪些执行：ALWAYS节点总是执行，NEVER节点从不执行，DEPENDS_ON_OUTPUTS节点
 *    当且仅当它的某个输出被一个“会执行且本次读取该输入”的下游节点消费时才执行（多个输出之间取“或”）。
 * 2. 执行：按拓扑顺序逐个执行被选中的节点，每个节点至多执行一次。
 */

use super::super::error::GraphError;
use super::super::types::{ForwardType, PassContext};
use super::Graph;
use crate::nn::nodes::TraitNode;
use crate::nn::terminal::NodeOutput;
use crate::nn::NodeId;
use crate::tensor::Tensor;
use std::collections::BTreeSet;

impl Graph {
    /// 执行一次前向传播
    pub fn forward(&mut self) -> Result<(), GraphError> {
        self.check_initialized()?;
        let phase = self.active_phase.clone();
        let ctx = PassContext {
            phase: phase.as_deref(),
            behaviour: phase.as_deref().and_then(|p| self.phases.get(p).copied()),
        };

        let plan = self.plan_forward(&ctx)?;
        let pass_id = self.last_forward_pass_id + 1;
        let order = self.topo_order.clone();
        for id in order.into_iter().filter(|id| plan.contains(id)) {
            self.forward_node(id, pass_id, &ctx)?;
        }

        self.last_forward_pass_id = pass_id;
        self.forward_phase = phase;
        log::debug!(
            "前向传播#{pass_id}（相位{:?}）：{}/{}个节点执行",
            self.forward_phase,
            plan.len(),
            self.nodes.len()
        );
        Ok(())
    }

    /// 决定本次前向中哪些节点会执行
    pub(in crate::nn::graph) fn plan_forward(&self, ctx: &PassContext) -> Result<BTreeSet<NodeId>, GraphError> {
        // 1. 按拓扑顺序求“可执行”的节点：属于当前相位、控制状态允许，且本次读取的每个输入的上游都可执行。
        //    关闭的开关、未选中输入的复用器因此会连同其下游一起被跳过。
        let mut available = BTreeSet::new();
        for &id in &self.topo_order {
            let node = self.get_node_by_id(id)?;
            let raw = node.raw_node();
            if !node.includes_phase(ctx.phase)
                || !raw.is_active(ctx)
                || raw.forward_type() == ForwardType::Never
            {
                continue;
            }
            let mut inputs_ready = true;
            for (slot, input) in node.inputs().iter().enumerate() {
                if !raw.input_active(slot, ctx) {
                    continue;
                }
                let source = input.source().ok_or_else(|| GraphError::UnboundInput {
                    node: node.name().to_string(),
                    slot,
                })?;
                if !available.contains(&source.node) {
                    inputs_ready = false;
                    break;
                }
            }
            if inputs_ready {
                available.insert(id);
            } else {
                log::trace!("{node}的上游在本次前向中不会执行，跳过");
            }
        }

        // 2. 按逆拓扑顺序求“需要执行”的节点
        let mut plan = BTreeSet::new();
        for &id in self.topo_order.iter().rev() {
            if !available.contains(&id) {
                continue;
            }
            let raw = self.get_node_by_id(id)?.raw_node();
            let will_forward = match raw.forward_type() {
                ForwardType::Always => true,
                ForwardType::Never => false,
                ForwardType::DependsOnOutputs => self
                    .consumers
                    .get(&id)
                    .into_iter()
                    .flatten()
                    .any(|&(consumer, slot)| {
                        plan.contains(&consumer)
                            && self
                                .nodes
                                .get(&consumer)
                                .is_some_and(|c| c.raw_node().input_active(slot, ctx))
                    }),
            };
            if will_forward {
                plan.insert(id);
            }
        }
        Ok(plan)
    }

    fn forward_node(&mut self, id: NodeId, pass_id: u64, ctx: &PassContext) -> Result<(), GraphError> {
        let Self {
            nodes, terminals, ..
        } = self;
        let node = nodes.get_mut(&id).ok_or(GraphError::NodeIdNotFound(id))?;
        if node.last_forward_pass_id() == pass_id {
            return Ok(());
        }

        // 先把本节点的输出端子取出，才能同时借用上游的输出
        let mut outputs = terminals.remove(&id).ok_or(GraphError::NodeIdNotFound(id))?;
        if !node.is_trainable() {
            // 非参数节点的梯度只在单次传播内有效
            outputs.iter_mut().for_each(NodeOutput::reset_diff);
        }

        let inputs = node
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
                    .and_then(|outs| outs.get(source.index))
                    .map(NodeOutput::value)
                    .ok_or(GraphError::NodeIdNotFound(source.node))
            })
            .collect::<Result<Vec<&Tensor>, GraphError>>();
        let result = inputs.and_then(|inputs| node.raw_node_mut().forward(&inputs, &mut outputs, ctx));

        terminals.insert(id, outputs);
        result?;
        node.mark_forwarded(pass_id);
        log::trace!("前向：{node}");
        Ok(())
    }
}
