/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : Graph 模块的类型定义：前向/反向参与策略、相位行为、单次传播的上下文
 */

use serde::{Deserialize, Serialize};

/// 节点参与前向传播的策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardType {
    /// 每次前向都执行（如损失节点）
    Always,
    /// 仅当至少一个下游消费者会执行时才执行
    DependsOnOutputs,
    /// 从不参与前向
    Never,
}

/// 节点参与反向传播的策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackwardType {
    /// 每次反向都执行（如损失节点）
    Always,
    /// 仅当至少一个上游输入需要梯度时才执行
    DependsOnInputs,
    /// 从不参与反向（如数据源）
    Never,
}

/// 相位的行为类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseBehaviour {
    Train,
    Validation,
    Inference,
}

/// 一次前向/反向传播期间对节点可见的只读上下文
#[derive(Debug, Clone, Copy, Default)]
pub struct PassContext<'a> {
    /// 当前激活的相位；None 表示所有节点都有资格执行
    pub phase: Option<&'a str>,
    /// 当前相位的行为类别；没有相位时为None
    pub behaviour: Option<PhaseBehaviour>,
}

impl PassContext<'_> {
    /// 是否按训练方式执行（批归一化用批统计量、丢弃层生效）；没有相位时视为训练
    pub fn is_training(&self) -> bool {
        matches!(self.behaviour, None | Some(PhaseBehaviour::Train))
    }
}
