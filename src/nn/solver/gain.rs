/*
 * @Author       : 老董
 * @Date         : 2026-02-06
 * @Description  : 带自适应增益的动量求解器
 *
 * 每个参数元素维护一个增益（初始为1）：
 * - 本次梯度与上次同号：gain = min(gain + gain_plus, max_gain)
 * - 异号：gain = max(gain * gain_mult, min_gain)
 * - 任一为0：增益不变
 * 然后 `vel = momentum*vel - lr*gain*diff; value += vel`
 */

use super::base::{check_same_shape, Solver, SolverDescriptor, SolverKind};
use crate::nn::{GraphError, NodeId};
use crate::tensor::Tensor;
use ndarray::Zip;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainParams {
    pub momentum: f32,
    pub learning_rate: f32,
    pub max_gain: f32,
    pub min_gain: f32,
    pub gain_plus: f32,
    pub gain_mult: f32,
}

impl Default for GainParams {
    fn default() -> Self {
        Self {
            momentum: 0.99999,
            learning_rate: 1e-4,
            max_gain: 10.,
            min_gain: 0.1,
            gain_plus: 0.05,
            gain_mult: 0.95,
        }
    }
}

/// 单个参数的辅助状态
#[derive(Debug)]
struct GainState {
    gain: Tensor,
    velocity: Tensor,
    prev_diff: Tensor,
}

#[derive(Debug)]
pub struct GainSolver {
    name: String,
    params: GainParams,
    states: HashMap<NodeId, GainState>,
}

impl GainSolver {
    pub fn new(name: &str, params: GainParams) -> Self {
        Self {
            name: name.to_string(),
            params,
            states: HashMap::new(),
        }
    }

    pub const fn params(&self) -> GainParams {
        self.params
    }

    /// 某参数当前的增益（尚未更新过则为None）
    pub fn gain_of(&self, id: NodeId) -> Option<&Tensor> {
        self.states.get(&id).map(|s| &s.gain)
    }
}

impl Solver for GainSolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, id: NodeId, value: &mut Tensor, diff: &Tensor) -> Result<(), GraphError> {
        check_same_shape(&self.name, value, diff)?;
        let p = self.params;
        let state = self.states.entry(id).or_insert_with(|| GainState {
            gain: Tensor::ones(value.dims()),
            velocity: Tensor::zeros(value.dims()),
            prev_diff: Tensor::zeros(value.dims()),
        });

        Zip::from(value.data_mut())
            .and(state.gain.data_mut())
            .and(state.velocity.data_mut())
            .and(state.prev_diff.data_mut())
            .and(diff.data())
            .for_each(|x, gain, v, prev, &g| {
                let agreement = g * *prev;
                if agreement > 0. {
                    *gain = (*gain + p.gain_plus).min(p.max_gain);
                } else if agreement < 0. {
                    *gain = (*gain * p.gain_mult).max(p.min_gain);
                }
                *v = p.momentum * *v - p.learning_rate * *gain * g;
                *x += *v;
                *prev = g;
            });
        Ok(())
    }

    fn reset(&mut self) {
        self.states.clear();
    }

    fn learning_rate(&self) -> Option<f32> {
        Some(self.params.learning_rate)
    }

    fn descriptor(&self) -> SolverDescriptor {
        SolverDescriptor {
            name: self.name.clone(),
            kind: SolverKind::Gain(self.params),
        }
    }

    fn to_code(&self) -> String {
        format!("gain_solver({:?}, {:?})", self.params, self.name)
    }
}
