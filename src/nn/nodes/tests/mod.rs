/*
 * @Author       : 老董
 * @Description  : 原始节点的单元测试：不经过计算图，直接调用 init/forward/backward
 */

mod elementwise_activation;
mod loss;
mod normalize_reshape;

use crate::nn::nodes::TraitNode;
use crate::nn::terminal::NodeOutput;
use crate::nn::PassContext;
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// 推断形状、分配（带梯度的）输出端子并执行一次前向
fn run_forward<N: TraitNode>(node: &mut N, inputs: &[&Tensor], ctx: &PassContext) -> Vec<NodeOutput> {
    let mut rng = StdRng::seed_from_u64(42);
    let shapes = inputs.iter().map(|t| t.dims()).collect::<Vec<_>>();
    let out_shapes = node.init(&shapes, &mut rng).unwrap();
    let mut outputs = out_shapes
        .into_iter()
        .map(|dims| NodeOutput::allocate(dims, true))
        .collect::<Vec<_>>();
    node.forward(inputs, &mut outputs, ctx).unwrap();
    outputs
}

/// 把`dy`写入第0个输出的梯度后执行反向，所有输入都需要梯度
fn run_backward<N: TraitNode>(
    node: &mut N,
    inputs: &[&Tensor],
    outputs: &mut [NodeOutput],
    dy: &Tensor,
    ctx: &PassContext,
) -> Vec<Option<Tensor>> {
    outputs[0].diff_mut().unwrap().assign(dy).unwrap();
    let needs = vec![true; inputs.len()];
    node.backward(inputs, outputs, &needs, ctx).unwrap()
}
