/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 参数初始化器：常数填充、均匀/正态随机、阶梯、按索引填充、三态随机。
 *                 随机数一律来自调用方传入的`StdRng`（由计算图的种子派生），不使用全局随机源。
 */

use crate::nn::GraphError;
use crate::tensor::{normalize_dims, Shape4, Tensor};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 初始化规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InitKind {
    Fill { value: f32 },
    RandomUniform { min: f32, max: f32 },
    RandomNormal { mean: f32, std: f32 },
    /// 阶梯：第i个元素为`min + i*(max-min)/size`
    Step { min: f32, max: f32 },
    /// 第i个元素为`i + offset`
    IndexFill { offset: f32 },
    /// 在{0,1,2,3}上均匀取整，再映射为-1、0、1、1
    ThreeState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Initializer {
    dims: Shape4,
    kind: InitKind,
    /// 预先算好的内容（`init()`生成，或从保存的模型中恢复）；存在时`apply`直接拷贝它
    content: Option<Tensor>,
}

impl Initializer {
    /// `dims`可以是1~4维，补齐规则与`Tensor::new`一致；超过4维会panic
    pub fn new(dims: &[usize], kind: InitKind) -> Self {
        let dims = match normalize_dims(dims) {
            Ok(dims) => dims,
            Err(e) => panic!("{}", e),
        };
        Self {
            dims,
            kind,
            content: None,
        }
    }

    pub fn fill(dims: &[usize], value: f32) -> Self {
        Self::new(dims, InitKind::Fill { value })
    }

    pub fn zeros(dims: &[usize]) -> Self {
        Self::fill(dims, 0.)
    }

    pub fn ones(dims: &[usize]) -> Self {
        Self::fill(dims, 1.)
    }

    pub fn random_uniform(dims: &[usize], min: f32, max: f32) -> Self {
        Self::new(dims, InitKind::RandomUniform { min, max })
    }

    pub fn random_normal(dims: &[usize], mean: f32, std: f32) -> Self {
        Self::new(dims, InitKind::RandomNormal { mean, std })
    }

    pub fn step(dims: &[usize], min: f32, max: f32) -> Self {
        Self::new(dims, InitKind::Step { min, max })
    }

    pub fn index_fill(dims: &[usize], offset: f32) -> Self {
        Self::new(dims, InitKind::IndexFill { offset })
    }

    pub fn three_state(dims: &[usize]) -> Self {
        Self::new(dims, InitKind::ThreeState)
    }

    pub const fn dims(&self) -> Shape4 {
        self.dims
    }

    pub const fn kind(&self) -> &InitKind {
        &self.kind
    }

    pub fn content(&self) -> Option<&Tensor> {
        self.content.as_ref()
    }

    /// 用已有内容（如保存下来的权重）作为预计算结果，形状必须一致
    pub fn set_content(&mut self, content: Tensor) -> Result<(), GraphError> {
        if content.dims() != self.dims {
            return Err(GraphError::ShapeMismatch {
                expected: self.dims.to_vec(),
                got: content.shape().to_vec(),
                message: "初始化器的预计算内容与其声明的形状不一致".to_string(),
            });
        }
        self.content = Some(content);
        Ok(())
    }

    /// 一次性生成内容并缓存，之后每次`apply`都写入相同的值
    pub fn init(&mut self, rng: &mut StdRng) {
        self.content = Some(self.generate(rng));
    }

    /// 把初始值写入目标张量（参数或数据生成器的输出）。形状不符是配置错误。
    pub fn apply(&self, target: &mut Tensor, rng: &mut StdRng) -> Result<(), GraphError> {
        if target.dims() != self.dims {
            return Err(GraphError::ShapeMismatch {
                expected: self.dims.to_vec(),
                got: target.shape().to_vec(),
                message: "初始化器的形状必须与其所属节点声明的形状完全一致".to_string(),
            });
        }
        match &self.content {
            Some(content) => target.assign(content)?,
            None => target.assign(&self.generate(rng))?,
        }
        Ok(())
    }

    /// 按规则生成一个新张量（不影响缓存的内容）
    pub fn generate(&self, rng: &mut StdRng) -> Tensor {
        let dims = self.dims;
        let size = dims.iter().product::<usize>();
        match self.kind {
            InitKind::Fill { value } => Tensor::full(value, dims),
            InitKind::RandomUniform { min, max } => Tensor::uniform_with_rng(min, max, dims, rng),
            InitKind::RandomNormal { mean, std } => Tensor::normal_with_rng(mean, std, dims, rng),
            InitKind::Step { min, max } => {
                let data = (0..size)
                    .map(|i| min + i as f32 * (max - min) / size as f32)
                    .collect::<Vec<_>>();
                Tensor::new(&data, &dims)
            }
            InitKind::IndexFill { offset } => {
                let data = (0..size).map(|i| i as f32 + offset).collect::<Vec<_>>();
                Tensor::new(&data, &dims)
            }
            InitKind::ThreeState => {
                let data = (0..size)
                    .map(|_| match rng.gen_range(0..=3) {
                        0 => -1.,
                        1 => 0.,
                        _ => 1.,
                    })
                    .collect::<Vec<_>>();
                Tensor::new(&data, &dims)
            }
        }
    }

    /// 渲染为构建该初始化器的代码
    pub fn to_code(&self) -> String {
        let dims = format!("&{:?}", self.dims);
        match self.kind {
            InitKind::Fill { value } => format!("Initializer::fill({dims}, {value:?})"),
            InitKind::RandomUniform { min, max } => {
                format!("Initializer::random_uniform({dims}, {min:?}, {max:?})")
            }
            InitKind::RandomNormal { mean, std } => {
                format!("Initializer::random_normal({dims}, {mean:?}, {std:?})")
            }
            InitKind::Step { min, max } => format!("Initializer::step({dims}, {min:?}, {max:?})"),
            InitKind::IndexFill { offset } => format!("Initializer::index_fill({dims}, {offset:?})"),
            InitKind::ThreeState => format!("Initializer::three_state({dims})"),
        }
    }
}
