/*
 * @Author       : 老董
 * @Date         : 2025-12-27
 * @Description  : 图描述符（Graph Descriptor）
 *                 统一的中间表示（IR），用于模型保存/加载、代码生成和摘要输出。
 *                 只描述结构与参数设置，不含张量数据（权重单独存入二进制参数文件）。
 */

use crate::nn::initializer::InitKind;
use crate::nn::nodes::raw_node::{
    ActivationMode, BatchNormParams, Conv2dParams, ElementwiseOp, LiftingMode, LossReduction,
    PoolingParams, ReduceOp,
};
use crate::nn::solver::SolverDescriptor;
use crate::nn::PhaseBehaviour;
use crate::tensor::Shape4;
use serde::{Deserialize, Serialize};

/// 图的可序列化描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDescriptor {
    /// 格式版本（用于向后兼容）
    pub version: String,
    /// 图名称
    pub name: String,
    /// 图的随机种子（None表示从系统熵创建）
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub seed: Option<u64>,
    /// 相位表
    pub phases: Vec<PhaseDescriptor>,
    /// 求解器
    pub solvers: Vec<SolverDescriptor>,
    /// 所有节点描述（按创建顺序）
    pub nodes: Vec<NodeDescriptor>,
    /// 参数文件路径（相对于 JSON 文件），仅在保存了权重或初始化器内容时使用
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub params_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDescriptor {
    pub name: String,
    pub behaviour: PhaseBehaviour,
}

/// 节点描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// 节点 ID
    pub id: u64,
    /// 节点名称
    pub name: String,
    /// 节点类型
    pub node_type: NodeTypeDescriptor,
    /// 各输入端子绑定的上游输出；None表示未绑定
    pub inputs: Vec<Option<InputDescriptor>>,
    /// 节点所属的相位（空表示所有相位）
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub phases: Vec<String>,
}

/// 输入端子绑定：上游节点名 + 其输出序号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub node: String,
    pub index: usize,
}

/// 节点类型描述（包含类型特定参数）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeTypeDescriptor {
    PlaceHolder {
        dims: Shape4,
    },
    Variable {
        init: InitKind,
        dims: Shape4,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        solver: Option<String>,
    },
    DataGenerator {
        init: InitKind,
        dims: Shape4,
    },
    Add {
        alpha: f32,
        beta: f32,
    },
    BiasAdd,
    Elementwise {
        op: ElementwiseOp,
    },
    Activation {
        mode: ActivationMode,
    },
    MatMul,
    Conv2d {
        params: Conv2dParams,
    },
    TransposedConv2d {
        params: Conv2dParams,
    },
    Pooling {
        params: PoolingParams,
    },
    BatchNormalization {
        params: BatchNormParams,
    },
    Dropout {
        ratio: f32,
    },
    Softmax,
    Restructure {
        first: usize,
        second: usize,
    },
    Lifting {
        mode: LiftingMode,
    },
    Reduce {
        op: ReduceOp,
        dim: usize,
    },
    Equal,
    SquareError,
    Loss {
        reduction: LossReduction,
        coef: bool,
    },
    SoftmaxLoss,
    Multiplexer {
        selected: Option<usize>,
    },
    Switch {
        enabled: bool,
    },
    Phaseplexer {
        phases: Vec<String>,
    },
    RandomSelector {
        probability: f32,
    },
}

impl GraphDescriptor {
    /// 创建新的图描述符
    pub fn new(name: &str) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            name: name.to_string(),
            seed: None,
            phases: Vec::new(),
            solvers: Vec::new(),
            nodes: Vec::new(),
            params_file: None,
        }
    }

    /// 添加节点描述
    pub fn add_node(&mut self, node: NodeDescriptor) {
        self.nodes.push(node);
    }

    pub fn node(&self, name: &str) -> Option<&NodeDescriptor> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// 获取可训练参数总量
    pub fn total_params(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|n| match &n.node_type {
                NodeTypeDescriptor::Variable { dims, .. } => Some(dims.iter().product::<usize>()),
                _ => None,
            })
            .sum()
    }

    /// 转换为 JSON 字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
