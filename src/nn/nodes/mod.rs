/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 节点：图中的顶点。`raw_node`是每种运算的具体实现，
 *                 `NodeHandle`在其外包一层图所需的簿记信息（名称、相位、输入绑定、传播id）。
 */

mod handles;
mod node_handle;
pub(crate) mod raw_node;

pub use handles::{MultiplexerHandle, PlaceholderHandle, SwitchHandle};
pub use node_handle::{NodeHandle, NodeId};
pub use raw_node::{NodeType, TraitNode};

#[cfg(test)]
mod tests;
