/*
 * @Author       : 老董
 * @Date         : 2026-02-06
 * @Description  : 带动量的随机梯度下降：`vel = momentum*vel - lr*diff; value += vel`。
 *                 momentum为0时即`value -= lr*diff`。
 */

use super::base::{check_same_shape, Solver, SolverDescriptor, SolverKind};
use crate::nn::{GraphError, NodeId};
use crate::tensor::Tensor;
use ndarray::Zip;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SgdParams {
    pub learning_rate: f32,
    pub momentum: f32,
}

impl Default for SgdParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            momentum: 0.,
        }
    }
}

#[derive(Debug)]
pub struct SgdSolver {
    name: String,
    params: SgdParams,
    /// 速度
    velocity: HashMap<NodeId, Tensor>,
}

impl SgdSolver {
    pub fn new(name: &str, params: SgdParams) -> Self {
        Self {
            name: name.to_string(),
            params,
            velocity: HashMap::new(),
        }
    }

    pub const fn params(&self) -> SgdParams {
        self.params
    }
}

impl Solver for SgdSolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, id: NodeId, value: &mut Tensor, diff: &Tensor) -> Result<(), GraphError> {
        check_same_shape(&self.name, value, diff)?;
        let SgdParams {
            learning_rate,
            momentum,
        } = self.params;
        let velocity = self
            .velocity
            .entry(id)
            .or_insert_with(|| Tensor::zeros(value.dims()));

        Zip::from(value.data_mut())
            .and(velocity.data_mut())
            .and(diff.data())
            .for_each(|x, v, &g| {
                *v = momentum * *v - learning_rate * g;
                *x += *v;
            });
        Ok(())
    }

    fn reset(&mut self) {
        self.velocity.clear();
    }

    fn learning_rate(&self) -> Option<f32> {
        Some(self.params.learning_rate)
    }

    fn descriptor(&self) -> SolverDescriptor {
        SolverDescriptor {
            name: self.name.clone(),
            kind: SolverKind::Sgd(self.params),
        }
    }

    fn to_code(&self) -> String {
        format!("sgd_solver({:?}, {:?})", self.params, self.name)
    }
}
