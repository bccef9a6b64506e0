/*
 * @Author       : 老董
 * @Date         : 2026-02-06
 * @Description  : Adam求解器：一阶、二阶原始矩估计 + 偏差修正
 *
 * m = β1·m + (1-β1)·g
 * v = β2·v + (1-β2)·g²
 * value -= lr · (m / (1-β1^t)) / (sqrt(v / (1-β2^t)) + ε)
 */

use super::base::{check_same_shape, Solver, SolverDescriptor, SolverKind};
use crate::nn::{GraphError, NodeId};
use crate::tensor::Tensor;
use ndarray::Zip;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdamParams {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
}

impl Default for AdamParams {
    fn default() -> Self {
        Self {
            learning_rate: 2e-4,
            beta1: 0.5,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

#[derive(Debug)]
pub struct AdamSolver {
    name: String,
    params: AdamParams,
    /// 一阶矩估计
    m: HashMap<NodeId, Tensor>,
    /// 二阶矩估计
    v: HashMap<NodeId, Tensor>,
    /// 时间步（每次`begin_step`递增）
    t: i32,
}

impl AdamSolver {
    pub fn new(name: &str, params: AdamParams) -> Self {
        Self {
            name: name.to_string(),
            params,
            m: HashMap::new(),
            v: HashMap::new(),
            t: 0,
        }
    }

    pub const fn params(&self) -> AdamParams {
        self.params
    }

    pub const fn step_count(&self) -> i32 {
        self.t
    }
}

impl Solver for AdamSolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin_step(&mut self) {
        self.t += 1;
    }

    fn update(&mut self, id: NodeId, value: &mut Tensor, diff: &Tensor) -> Result<(), GraphError> {
        check_same_shape(&self.name, value, diff)?;
        let AdamParams {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } = self.params;
        // 未经begin_step直接调用时按第1步处理
        let t = self.t.max(1);
        let bias1 = 1. - beta1.powi(t);
        let bias2 = 1. - beta2.powi(t);

        let m = self.m.entry(id).or_insert_with(|| Tensor::zeros(value.dims()));
        let v = self.v.entry(id).or_insert_with(|| Tensor::zeros(value.dims()));
        Zip::from(value.data_mut())
            .and(m.data_mut())
            .and(v.data_mut())
            .and(diff.data())
            .for_each(|x, m, v, &g| {
                *m = beta1 * *m + (1. - beta1) * g;
                *v = beta2 * *v + (1. - beta2) * g * g;
                let m_hat = *m / bias1;
                let v_hat = *v / bias2;
                *x -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
            });
        Ok(())
    }

    fn reset(&mut self) {
        self.m.clear();
        self.v.clear();
        self.t = 0;
    }

    fn learning_rate(&self) -> Option<f32> {
        Some(self.params.learning_rate)
    }

    fn descriptor(&self) -> SolverDescriptor {
        SolverDescriptor {
            name: self.name.clone(),
            kind: SolverKind::Adam(self.params),
        }
    }

    fn to_code(&self) -> String {
        format!("adam_solver({:?}, {:?})", self.params, self.name)
    }
}
