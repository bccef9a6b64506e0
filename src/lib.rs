//! # Deep Flow
//!
//! `deep_flow`是一个纯rust实现的计算图引擎：节点（数据源、算子、损失、路由）
//! 通过输出端子相连，按需执行条件前向/反向传播，再由按名字分组的求解器更新可训练参数。
//!
//! - 同一张图中可以有多个互不干扰的求解器组（如GAN的生成器与判别器）；
//! - 复用器、开关与相位复用器决定每次传播实际执行的子图；
//! - 图可以导出为描述符（JSON + 参数文件）或等价的构建代码。
//!

pub mod errors;
pub mod nn;
pub mod tensor;
pub mod utils;
