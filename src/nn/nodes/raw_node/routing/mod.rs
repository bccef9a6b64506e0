/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : 路由节点：其控制状态（选中的输入、开关、相位）在每次前向开始时读取，
 *                 使同一张静态图在不同迭代中执行不同的逻辑子图，而无需重新初始化。
 *                 控制状态只能在两次传播之间由驱动循环修改（见`Session::select_input`等）；
 *                 反向沿最近一次前向实际走过的分支回传。
 */

mod multiplexer;
mod phaseplexer;
mod random_selector;
mod switch;

pub use multiplexer::Multiplexer;
pub use phaseplexer::Phaseplexer;
pub use random_selector::RandomSelector;
pub use switch::Switch;

use super::{output_diff, same_shapes};
use crate::nn::terminal::NodeOutput;
use crate::nn::GraphError;
use crate::tensor::{Shape4, Tensor};

/// 各路由节点共用：所有输入同形，输出与之相同
fn routed_shape(input_shapes: &[Shape4], kind: &str) -> Result<Vec<Shape4>, GraphError> {
    Ok(vec![same_shapes(input_shapes, kind)?])
}

/// 把输出梯度原样交给第`slot`个输入，其余输入不接收梯度
fn route_backward(
    outputs: &[NodeOutput],
    slot: Option<usize>,
    needs: &[bool],
    kind: &str,
) -> Result<Vec<Option<Tensor>>, GraphError> {
    let mut grads = vec![None; needs.len()];
    if let Some(slot) = slot.filter(|&s| needs.get(s).copied().unwrap_or(false)) {
        grads[slot] = Some(output_diff(outputs, 0, kind)?.clone());
    }
    Ok(grads)
}
