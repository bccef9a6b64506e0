/*
 * @Author       : 老董
 * @Date         : 2026-02-07
 * @Description  : Graph 控制状态：复用器的选中输入、开关、占位节点的值。
 *                 只应在两次传播之间修改；下一次前向开始时生效，无需重新初始化。
 */

use super::super::error::GraphError;
use super::Graph;
use crate::nn::nodes::{MultiplexerHandle, NodeType, PlaceholderHandle, SwitchHandle};
use crate::nn::OutputRef;
use crate::tensor::Tensor;

impl Graph {
    // ========== 按名称取带类型的句柄 ==========

    pub fn multiplexer_handle(&self, name: &str) -> Result<MultiplexerHandle, GraphError> {
        let node = self.get_node(name)?;
        match node.raw_node() {
            NodeType::Multiplexer(_) => Ok(MultiplexerHandle::new(node.id())),
            _ => Err(GraphError::InvalidOperation(format!("{node}不是复用器"))),
        }
    }

    pub fn switch_handle(&self, name: &str) -> Result<SwitchHandle, GraphError> {
        let node = self.get_node(name)?;
        match node.raw_node() {
            NodeType::Switch(_) => Ok(SwitchHandle::new(node.id())),
            _ => Err(GraphError::InvalidOperation(format!("{node}不是开关"))),
        }
    }

    pub fn placeholder_handle(&self, name: &str) -> Result<PlaceholderHandle, GraphError> {
        let node = self.get_node(name)?;
        match node.raw_node() {
            NodeType::PlaceHolder(_) => Ok(PlaceholderHandle::new(node.id())),
            _ => Err(GraphError::InvalidOperation(format!("{node}不是占位节点"))),
        }
    }

    // ========== 修改控制状态 ==========

    /// 选中复用器的第`index`路输入；None 表示不选中（该复用器及只为它服务的上游分支不再执行）
    pub fn select_input(&mut self, mux: MultiplexerHandle, index: Option<usize>) -> Result<(), GraphError> {
        let node = self.get_node_by_id_mut(mux.id())?;
        match node.raw_node_mut() {
            NodeType::Multiplexer(m) => m.select(index),
            _ => Err(GraphError::InvalidOperation(format!("节点{}不是复用器", mux.id()))),
        }
    }

    pub fn selected_input(&self, mux: MultiplexerHandle) -> Result<Option<usize>, GraphError> {
        match self.get_node_by_id(mux.id())?.raw_node() {
            NodeType::Multiplexer(m) => Ok(m.selected()),
            _ => Err(GraphError::InvalidOperation(format!("节点{}不是复用器", mux.id()))),
        }
    }

    pub fn set_enabled(&mut self, switch: SwitchHandle, enabled: bool) -> Result<(), GraphError> {
        let node = self.get_node_by_id_mut(switch.id())?;
        match node.raw_node_mut() {
            NodeType::Switch(s) => {
                s.set_enabled(enabled);
                Ok(())
            }
            _ => Err(GraphError::InvalidOperation(format!("节点{}不是开关", switch.id()))),
        }
    }

    pub fn is_enabled(&self, switch: SwitchHandle) -> Result<bool, GraphError> {
        match self.get_node_by_id(switch.id())?.raw_node() {
            NodeType::Switch(s) => Ok(s.enabled()),
            _ => Err(GraphError::InvalidOperation(format!("节点{}不是开关", switch.id()))),
        }
    }

    /// 写入占位节点的值（需已初始化，形状须与声明一致）
    pub fn write_values(&mut self, placeholder: PlaceholderHandle, values: &Tensor) -> Result<(), GraphError> {
        if !matches!(
            self.get_node_by_id(placeholder.id())?.raw_node(),
            NodeType::PlaceHolder(_)
        ) {
            return Err(GraphError::InvalidOperation(format!(
                "节点{}不是占位节点",
                placeholder.id()
            )));
        }
        let terminal = self.terminal_mut(OutputRef::new(placeholder.id(), 0))?;
        if terminal.dims() != values.dims() {
            return Err(GraphError::ShapeMismatch {
                expected: terminal.dims().to_vec(),
                got: values.shape().to_vec(),
                message: format!("写入占位节点{}的值形状不符", placeholder.id()),
            });
        }
        terminal.value_mut().assign(values)?;
        Ok(())
    }

    /// 占位节点的全部元素置为同一个值
    pub fn fill_values(&mut self, placeholder: PlaceholderHandle, value: f32) -> Result<(), GraphError> {
        let dims = self.value(placeholder.output())?.dims();
        self.write_values(placeholder, &Tensor::full(value, dims))
    }
}
