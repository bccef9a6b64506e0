/*
 * @Author       : 老董
 * @Date         : 2026-02-04
 * @Description  : 沿某一维做归约：求和、均值、最大值、最大值下标。
 *                 被归约的维度在输出中保留为1，例如对[N, C, 1, 1]沿dim=1求argmax得到[N, 1, 1, 1]。
 */

use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{BackwardType, GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use ndarray::{Array4, Axis};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReduceOp {
    Sum,
    Mean,
    Max,
    /// 输出最大值所在的下标（以f32存储），不可导
    Argmax,
}

#[derive(Debug, Clone)]
pub struct Reduce {
    op: ReduceOp,
    dim: usize,
    /// Max/Argmax：每个输出位置在被归约维度上取到的下标
    picked: Array4<usize>,
}

impl Reduce {
    pub(crate) fn new(op: ReduceOp, dim: usize) -> Self {
        Self {
            op,
            dim,
            picked: Array4::zeros([0, 0, 0, 0]),
        }
    }

    pub const fn op(&self) -> ReduceOp {
        self.op
    }

    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// 把输出坐标在被归约维度上替换为`k`，得到输入坐标
    fn source_index(&self, (n, c, h, w): (usize, usize, usize, usize), k: usize) -> [usize; 4] {
        let mut index = [n, c, h, w];
        index[self.dim] = k;
        index
    }
}

impl TraitNode for Reduce {
    fn kind(&self) -> &'static str {
        match self.op {
            ReduceOp::Sum => "ReduceSum",
            ReduceOp::Mean => "ReduceMean",
            ReduceOp::Max => "ReduceMax",
            ReduceOp::Argmax => "Argmax",
        }
    }

    fn min_num_inputs(&self) -> usize {
        1
    }

    fn backward_type(&self) -> BackwardType {
        match self.op {
            ReduceOp::Argmax => BackwardType::Never,
            _ => BackwardType::DependsOnInputs,
        }
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        if self.dim > 3 {
            return Err(GraphError::InvalidOperation(format!(
                "{}节点的归约维度必须在0~3之间，得到{}",
                self.kind(),
                self.dim
            )));
        }
        let mut dims = input_shapes[0];
        dims[self.dim] = 1;
        self.picked = Array4::zeros(dims);
        Ok(vec![dims])
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let x = inputs[0].view();
        let len = x.len_of(Axis(self.dim));
        let dims = outputs[0].dims();

        let data = match self.op {
            ReduceOp::Sum | ReduceOp::Mean => {
                let scale = if self.op == ReduceOp::Mean { 1. / len as f32 } else { 1. };
                Array4::from_shape_fn(dims, |pos| {
                    (0..len).map(|k| x[self.source_index(pos, k)]).sum::<f32>() * scale
                })
            }
            ReduceOp::Max | ReduceOp::Argmax => {
                let mut data = Array4::<f32>::zeros(dims);
                for (pos, out) in data.indexed_iter_mut() {
                    let mut best = 0;
                    for k in 1..len {
                        if x[self.source_index(pos, k)] > x[self.source_index(pos, best)] {
                            best = k;
                        }
                    }
                    self.picked[[pos.0, pos.1, pos.2, pos.3]] = best;
                    *out = match self.op {
                        ReduceOp::Argmax => best as f32,
                        _ => x[self.source_index(pos, best)],
                    };
                }
                data
            }
        };
        write_output(outputs, 0, &Tensor::from_array(data))
    }

    fn backward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        if !needs[0] || self.op == ReduceOp::Argmax {
            return Ok(vec![None]);
        }
        let dy = output_diff(outputs, 0, self.kind())?.view();
        let x_dims = inputs[0].dims();
        let len = x_dims[self.dim];

        let dx = match self.op {
            ReduceOp::Max => {
                let mut dx = Array4::<f32>::zeros(x_dims);
                for (pos, &k) in self.picked.indexed_iter() {
                    dx[self.source_index(pos, k)] += dy[[pos.0, pos.1, pos.2, pos.3]];
                }
                dx
            }
            _ => {
                let scale = if self.op == ReduceOp::Mean { 1. / len as f32 } else { 1. };
                let dim = self.dim;
                Array4::from_shape_fn(x_dims, |(n, c, h, w)| {
                    let mut index = [n, c, h, w];
                    index[dim] = 0;
                    dy[index] * scale
                })
            }
        };
        Ok(vec![Some(Tensor::from_array(dx))])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Reduce {
            op: self.op,
            dim: self.dim,
        }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        let method = match self.op {
            ReduceOp::Sum => "reduce_sum",
            ReduceOp::Mean => "reduce_mean",
            ReduceOp::Max => "reduce_max",
            ReduceOp::Argmax => "argmax",
        };
        format!("{method}({}, {}, Some({name:?}))", inputs[0], self.dim)
    }
}
