/*
 * @Author       : 老董
 * @Date         : 2026-02-06
 * @Description  : Adadelta求解器：梯度平方与更新量平方的滑动平均，无显式学习率
 *
 * E[g²]  = ρ·E[g²] + (1-ρ)·g²
 * Δx     = -sqrt(E[Δx²] + ε) / sqrt(E[g²] + ε) · g
 * E[Δx²] = ρ·E[Δx²] + (1-ρ)·Δx²
 * value += Δx
 */

use super::base::{check_same_shape, Solver, SolverDescriptor, SolverKind};
use crate::nn::{GraphError, NodeId};
use crate::tensor::Tensor;
use ndarray::Zip;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdadeltaParams {
    pub rho: f32,
    pub epsilon: f32,
}

impl Default for AdadeltaParams {
    fn default() -> Self {
        Self {
            rho: 0.95,
            epsilon: 1e-6,
        }
    }
}

#[derive(Debug)]
struct AdadeltaState {
    avg_sq_grad: Tensor,
    avg_sq_delta: Tensor,
}

#[derive(Debug)]
pub struct AdadeltaSolver {
    name: String,
    params: AdadeltaParams,
    states: HashMap<NodeId, AdadeltaState>,
}

impl AdadeltaSolver {
    pub fn new(name: &str, params: AdadeltaParams) -> Self {
        Self {
            name: name.to_string(),
            params,
            states: HashMap::new(),
        }
    }

    pub const fn params(&self) -> AdadeltaParams {
        self.params
    }
}

impl Solver for AdadeltaSolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, id: NodeId, value: &mut Tensor, diff: &Tensor) -> Result<(), GraphError> {
        check_same_shape(&self.name, value, diff)?;
        let AdadeltaParams { rho, epsilon } = self.params;
        let state = self.states.entry(id).or_insert_with(|| AdadeltaState {
            avg_sq_grad: Tensor::zeros(value.dims()),
            avg_sq_delta: Tensor::zeros(value.dims()),
        });

        Zip::from(value.data_mut())
            .and(state.avg_sq_grad.data_mut())
            .and(state.avg_sq_delta.data_mut())
            .and(diff.data())
            .for_each(|x, eg, edx, &g| {
                *eg = rho * *eg + (1. - rho) * g * g;
                let delta = -((*edx + epsilon).sqrt() / (*eg + epsilon).sqrt()) * g;
                *edx = rho * *edx + (1. - rho) * delta * delta;
                *x += delta;
            });
        Ok(())
    }

    fn reset(&mut self) {
        self.states.clear();
    }

    fn learning_rate(&self) -> Option<f32> {
        None
    }

    fn descriptor(&self) -> SolverDescriptor {
        SolverDescriptor {
            name: self.name.clone(),
            kind: SolverKind::Adadelta(self.params),
        }
    }

    fn to_code(&self) -> String {
        format!("adadelta_solver({:?}, {:?})", self.params, self.name)
    }
}
