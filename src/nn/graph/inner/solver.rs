/*
 * @Author       : 老董
 * @Date         : 2026-02-07
 * @Description  : Graph 求解器：登记、应用、梯度清零
 */

use super::super::error::GraphError;
use super::Graph;
use crate::nn::nodes::NodeType;
use crate::nn::solver::{
    AdadeltaParams, AdadeltaSolver, AdamParams, AdamSolver, GainParams, GainSolver, SgdParams,
    SgdSolver, Solver,
};
use crate::nn::terminal::NodeOutput;

impl Graph {
    // ========== 登记 ==========

    /// 登记一个求解器；同名求解器只能有一个
    pub fn add_solver(&mut self, solver: Box<dyn Solver>) -> Result<(), GraphError> {
        self.check_not_initialized("添加求解器")?;
        let name = solver.name().to_string();
        if name.is_empty() {
            return Err(GraphError::InvalidOperation("求解器名不能为空".to_string()));
        }
        if self.solvers.contains_key(&name) {
            return Err(GraphError::InvalidOperation(format!(
                "求解器{name}在图{}中重复",
                self.name
            )));
        }
        self.solvers.insert(name, solver);
        Ok(())
    }

    pub fn sgd_solver(&mut self, params: SgdParams, name: &str) -> Result<(), GraphError> {
        self.add_solver(Box::new(SgdSolver::new(name, params)))
    }

    pub fn gain_solver(&mut self, params: GainParams, name: &str) -> Result<(), GraphError> {
        self.add_solver(Box::new(GainSolver::new(name, params)))
    }

    pub fn adam_solver(&mut self, params: AdamParams, name: &str) -> Result<(), GraphError> {
        self.add_solver(Box::new(AdamSolver::new(name, params)))
    }

    pub fn adadelta_solver(&mut self, params: AdadeltaParams, name: &str) -> Result<(), GraphError> {
        self.add_solver(Box::new(AdadeltaSolver::new(name, params)))
    }

    pub fn solver(&self, name: &str) -> Result<&dyn Solver, GraphError> {
        self.solvers
            .get(name)
            .map(|s| s.as_ref())
            .ok_or_else(|| GraphError::SolverNotFound(name.to_string()))
    }

    pub fn solver_names(&self) -> Vec<&str> {
        self.solvers.keys().map(String::as_str).collect()
    }

    /// 清空所有求解器的辅助状态
    pub fn reset_solvers(&mut self) {
        self.solvers.values_mut().for_each(|s| s.reset());
    }

    // ========== 应用 ==========

    /// 用各参数当前累积的梯度更新参数值。
    /// `names`为None时应用所有求解器，否则只应用指定的求解器（只影响绑定到它们的参数）。
    pub fn apply_solvers(&mut self, names: Option<&[&str]>) -> Result<(), GraphError> {
        self.check_initialized()?;
        let selected: Vec<String> = match names {
            None => self.solvers.keys().cloned().collect(),
            Some(names) => {
                for name in names {
                    if !self.solvers.contains_key(*name) {
                        return Err(GraphError::SolverNotFound(name.to_string()));
                    }
                }
                // 同一求解器在一次调用中只应用一次
                let mut selected: Vec<String> = Vec::with_capacity(names.len());
                for name in names {
                    if !selected.iter().any(|s| s == name) {
                        selected.push(name.to_string());
                    }
                }
                selected
            }
        };

        let Self {
            nodes,
            terminals,
            solvers,
            ..
        } = self;
        for name in &selected {
            let solver = solvers
                .get_mut(name)
                .ok_or_else(|| GraphError::SolverNotFound(name.clone()))?;
            solver.begin_step();

            let mut updated = 0;
            for (id, node) in nodes.iter() {
                let NodeType::Variable(var) = node.raw_node() else {
                    continue;
                };
                if var.solver() != Some(name.as_str()) {
                    continue;
                }
                let output = terminals
                    .get_mut(id)
                    .and_then(|outs| outs.first_mut())
                    .ok_or(GraphError::NodeIdNotFound(*id))?;
                let (value, diff) = output.value_and_diff_mut();
                let diff = diff.ok_or_else(|| {
                    GraphError::ComputationError(format!("{node}没有梯度缓冲"))
                })?;
                solver.update(*id, value, diff)?;
                updated += 1;
            }

            if updated == 0 {
                log::warn!("求解器{name}没有绑定任何参数");
            } else {
                log::info!("求解器{name}更新了{updated}个参数");
            }
        }
        Ok(())
    }

    /// 所有输出端子的梯度清零
    pub fn reset_gradients(&mut self) {
        self.terminals
            .values_mut()
            .flatten()
            .for_each(NodeOutput::reset_diff);
    }
}
