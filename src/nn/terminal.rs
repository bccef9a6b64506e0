/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 端子（terminal）：节点间的连接点。
 *                 输出端子独占一个值张量和一个可选的梯度（diff）张量，可以被多个输入端子共享读取；
 *                 输入端子只保存对上游某个输出端子的非占有引用（节点id + 输出序号）。
 */

use super::NodeId;
use crate::tensor::{Shape4, Tensor};
use serde::{Deserialize, Serialize};

/// 指向某节点第`index`个输出端子的句柄。图定义接口的每个构建方法都返回它，
/// 用作后续构建调用的输入。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputRef {
    pub node: NodeId,
    pub index: usize,
}

impl OutputRef {
    pub const fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

/// 输入端子：未绑定时`source`为None，节点初始化时会因此直接失败
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeInput {
    source: Option<OutputRef>,
}

impl NodeInput {
    pub fn bound(source: OutputRef) -> Self {
        Self {
            source: Some(source),
        }
    }

    pub fn source(&self) -> Option<OutputRef> {
        self.source
    }

    pub fn bind(&mut self, source: OutputRef) {
        self.source = Some(source);
    }

    pub fn unbind(&mut self) {
        self.source = None;
    }

    pub fn is_bound(&self) -> bool {
        self.source.is_some()
    }
}

/// 输出端子：值张量 + 可选的同形梯度张量
#[derive(Debug, Clone)]
pub struct NodeOutput {
    value: Tensor,
    diff: Option<Tensor>,
}

impl NodeOutput {
    /// 按声明的形状分配值张量；`with_diff`为真时一并分配同形的梯度张量
    pub fn allocate(dims: Shape4, with_diff: bool) -> Self {
        Self {
            value: Tensor::zeros(dims),
            diff: with_diff.then(|| Tensor::zeros(dims)),
        }
    }

    pub fn dims(&self) -> Shape4 {
        self.value.dims()
    }

    pub fn value(&self) -> &Tensor {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Tensor {
        &mut self.value
    }

    pub fn diff(&self) -> Option<&Tensor> {
        self.diff.as_ref()
    }

    pub fn diff_mut(&mut self) -> Option<&mut Tensor> {
        self.diff.as_mut()
    }

    /// 值与梯度同时借出（求解器更新参数时使用）
    pub fn value_and_diff_mut(&mut self) -> (&mut Tensor, Option<&Tensor>) {
        (&mut self.value, self.diff.as_ref())
    }

    /// 把一次反向传播贡献的梯度累加进来；没有梯度缓冲的端子直接忽略
    pub fn accumulate_diff(&mut self, grad: &Tensor) {
        if let Some(diff) = self.diff.as_mut() {
            *diff += grad;
        }
    }

    pub fn reset_diff(&mut self) {
        if let Some(diff) = self.diff.as_mut() {
            diff.fill(0.);
        }
    }
}
