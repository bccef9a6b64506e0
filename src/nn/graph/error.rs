/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : 计算图的错误类型
 *                 图的配置错误（输入未绑定、形状不符、参数组合非法）在初始化时一次性检出；
 *                 控制错误（不存在的相位、节点、求解器）在调用处直接返回。
 *                 核心不做任何重试，是否终止由驱动程序决定。
 */

use crate::errors::TensorError;
use crate::nn::NodeId;
use thiserror::Error;

/// Graph 操作错误类型
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("非法操作：{0}")]
    InvalidOperation(String),
    #[error("形状不匹配（期望{expected:?}，实际{got:?}）：{message}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    #[error("节点`{node}`的第{slot}个输入尚未绑定")]
    UnboundInput { node: String, slot: usize },
    #[error("找不到名为`{0}`的节点")]
    NodeNotFound(String),
    #[error("找不到{0:?}")]
    NodeIdNotFound(NodeId),
    #[error("相位`{0}`未定义")]
    PhaseNotFound(String),
    #[error("求解器`{0}`不存在")]
    SolverNotFound(String),
    #[error("节点名`{0}`在图中重复")]
    DuplicateNodeName(String),
    #[error("计算图尚未初始化")]
    NotInitialized,
    #[error("计算图已经初始化，不能再修改其结构")]
    AlreadyInitialized,
    #[error("计算错误：{0}")]
    ComputationError(String),
    #[error("文件读写失败：{0}")]
    Io(String),
    #[error("（反）序列化失败：{0}")]
    Serialization(String),
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

impl From<std::io::Error> for GraphError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for GraphError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
