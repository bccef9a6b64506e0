/*
 * @Author       : 老董
 * @Date         : 2026-02-07
 * @Description  : Graph 结构编辑：删除节点、重新绑定输入、重新绑定求解器、给节点打相位标签。
 *                 只能在初始化之前进行。
 */

use super::super::error::GraphError;
use super::Graph;
use crate::nn::nodes::{NodeType, TraitNode};
use crate::nn::{NodeId, OutputRef};

impl Graph {
    /// 删除节点。所有绑定到被删节点输出的输入端子都变为未绑定，需重新绑定，否则初始化会失败。
    pub fn remove_nodes(&mut self, names: &[&str]) -> Result<(), GraphError> {
        self.check_not_initialized("删除节点")?;
        let ids = names
            .iter()
            .map(|name| self.node_id(name))
            .collect::<Result<Vec<NodeId>, GraphError>>()?;

        for id in &ids {
            if let Some(node) = self.nodes.remove(id) {
                log::info!("删除{node}");
            }
        }
        for node in self.nodes.values_mut() {
            for input in node.inputs_mut() {
                if input.source().is_some_and(|s| ids.contains(&s.node)) {
                    input.unbind();
                }
            }
        }
        Ok(())
    }

    /// 把节点`name`的第`slot`个输入重新绑定到`source`
    pub fn bind_input(&mut self, name: &str, slot: usize, source: OutputRef) -> Result<(), GraphError> {
        self.check_not_initialized("重新绑定输入")?;
        let producer = self.get_node_by_id(source.node)?;
        if source.index >= producer.raw_node().min_num_outputs() {
            return Err(GraphError::InvalidOperation(format!(
                "{producer}没有第{}个输出",
                source.index
            )));
        }
        let id = self.node_id(name)?;
        if id == source.node {
            return Err(GraphError::InvalidOperation(format!(
                "节点{name}不能以自身的输出作为输入"
            )));
        }
        let node = self.get_node_by_id_mut(id)?;
        let input = node.inputs_mut().get_mut(slot).ok_or_else(|| {
            GraphError::InvalidOperation(format!("节点{name}没有第{slot}个输入"))
        })?;
        input.bind(source);
        Ok(())
    }

    /// 把变量绑定到求解器`solver`（None表示解除绑定）；`names`为空时作用于所有变量
    pub fn set_solver_for_variables(&mut self, solver: Option<&str>, names: &[&str]) -> Result<(), GraphError> {
        self.check_not_initialized("重新绑定求解器")?;
        if let Some(solver) = solver {
            if !self.solvers.contains_key(solver) {
                return Err(GraphError::SolverNotFound(solver.to_string()));
            }
        }
        let ids = self.resolve_targets(names)?;
        for id in ids {
            let node = self.get_node_by_id_mut(id)?;
            if let NodeType::Variable(var) = node.raw_node_mut() {
                var.set_solver(solver);
            } else if !names.is_empty() {
                return Err(GraphError::InvalidOperation(format!(
                    "{node}不是变量，无法绑定求解器"
                )));
            }
        }
        Ok(())
    }

    /// 把节点归入相位`phase`；`names`为空时作用于所有节点
    pub fn set_phase_for_nodes(&mut self, phase: &str, names: &[&str]) -> Result<(), GraphError> {
        self.check_not_initialized("修改节点相位")?;
        self.check_phase(phase)?;
        for id in self.resolve_targets(names)? {
            self.get_node_by_id_mut(id)?.add_phase(phase);
        }
        Ok(())
    }

    /// 名称列表转为id；空列表表示所有节点
    fn resolve_targets(&self, names: &[&str]) -> Result<Vec<NodeId>, GraphError> {
        if names.is_empty() {
            Ok(self.nodes())
        } else {
            names.iter().map(|name| self.node_id(name)).collect()
        }
    }
}
