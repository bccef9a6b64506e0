/*
 * @Author       : 老董
 * @Description  : 计算图（Graph/Session）层面的单元测试
 */

mod graph_backward;
mod persistence;
mod routing;
mod session;
mod solver_groups;

use crate::nn::{Graph, Initializer, LossReduction, PlaceholderHandle, SgdParams};
use crate::tensor::Tensor;

/// `loss = avg((w - t)²)`，w初值3（绑定到求解器"sgd"，学习率0.1），t写入1。
/// 此时 loss = 4，dloss/dw = 4。
fn regression_graph() -> (Graph, PlaceholderHandle) {
    let mut graph = Graph::with_name_and_seed("regression", 7);
    graph
        .sgd_solver(SgdParams { learning_rate: 0.1, momentum: 0. }, "sgd")
        .unwrap();
    let w = graph
        .variable(Initializer::fill(&[1], 3.), Some("sgd"), Some("w"))
        .unwrap();
    let t = graph.place_holder(&[1], Some("t")).unwrap();
    let se = graph.square_error(w, t.output(), Some("se")).unwrap();
    graph.loss(se, None, LossReduction::Avg, Some("loss")).unwrap();
    graph.initialize().unwrap();
    graph.write_values(t, &Tensor::new(&[1.], &[1])).unwrap();
    (graph, t)
}

fn scalar(graph: &Graph, name: &str) -> f32 {
    graph.value_of(name).unwrap().number().unwrap()
}

fn diff_scalar(graph: &Graph, name: &str) -> f32 {
    graph.diff_of(name).unwrap().unwrap().number().unwrap()
}
