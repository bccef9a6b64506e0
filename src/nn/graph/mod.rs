/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : Graph 模块：计算图（节点arena）的核心实现
 *
 * 公开 API：
 * - `Graph`: 节点arena，图定义、初始化、前向/反向、求解器、持久化都在其 impl 块中
 * - `GraphError`: 错误类型
 */

mod error;
mod inner;
mod types;

pub use error::GraphError;
pub use inner::{Graph, SaveOptions};
pub use types::{BackwardType, ForwardType, PassContext, PhaseBehaviour};
