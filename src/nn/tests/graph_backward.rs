/*
 * @Author       : 老董
 * @Description  : 条件反向传播与梯度生命周期：参数梯度跨反向累加直到reset，其余节点的梯度只在单次传播内有效
 */

use super::{diff_scalar, regression_graph, scalar};
use crate::nn::{Graph, Initializer, LossReduction};
use crate::tensor::Tensor;

#[test]
fn test_gradient_of_square_error() {
    let (mut graph, _) = regression_graph();
    graph.forward().unwrap();
    assert_eq!(scalar(&graph, "loss"), 4.);
    graph.backward().unwrap();
    assert_eq!(diff_scalar(&graph, "w"), 4.);
    // 占位节点不需要梯度
    assert!(graph.diff_of("t").unwrap().is_none());
}

#[test]
fn test_variable_gradients_accumulate_until_reset() {
    let (mut graph, _) = regression_graph();
    for expected in [4., 8., 12.] {
        graph.forward().unwrap();
        graph.backward().unwrap();
        assert_eq!(diff_scalar(&graph, "w"), expected);
        // 中间节点的梯度只反映本次传播
        assert_eq!(diff_scalar(&graph, "se"), 1.);
    }

    graph.reset_gradients();
    assert_eq!(diff_scalar(&graph, "w"), 0.);
    graph.forward().unwrap();
    graph.backward().unwrap();
    assert_eq!(diff_scalar(&graph, "w"), 4.);
}

#[test]
fn test_repeated_backward_after_one_forward() {
    let (mut graph, _) = regression_graph();
    graph.forward().unwrap();
    graph.backward().unwrap();
    graph.backward().unwrap();
    // 参数梯度累加两次，中间节点的梯度仍只反映单次反向
    assert_eq!(diff_scalar(&graph, "w"), 8.);
    assert_eq!(diff_scalar(&graph, "se"), 1.);
    assert_eq!(graph.last_backward_pass_id(), 2);
}

/// 两次“前向+反向”之间不清零，参数梯度等于两次单独梯度之和
#[test]
fn test_accumulation_is_linear_in_loss_coefficient() {
    let mut graph = Graph::new();
    let w = graph
        .variable(Initializer::fill(&[1], 3.), None, Some("w"))
        .unwrap();
    let t = graph.place_holder(&[1], Some("t")).unwrap();
    let coef = graph.place_holder(&[1], Some("coef")).unwrap();
    let se = graph.square_error(w, t.output(), Some("se")).unwrap();
    graph
        .loss(se, Some(coef.output()), LossReduction::Avg, Some("loss"))
        .unwrap();
    graph.initialize().unwrap();
    graph.fill_values(t, 1.).unwrap();

    graph.fill_values(coef, 1.).unwrap();
    graph.forward().unwrap();
    graph.backward().unwrap();
    graph.fill_values(coef, 2.).unwrap();
    graph.forward().unwrap();
    assert_eq!(scalar(&graph, "loss"), 8.);
    graph.backward().unwrap();
    assert_eq!(diff_scalar(&graph, "w"), 12.);
}

#[test]
fn test_fan_out_gradients_are_summed() {
    let mut graph = Graph::new();
    let w = graph
        .variable(Initializer::index_fill(&[3], 1.), None, Some("w"))
        .unwrap();
    let doubled = graph.add(w, w, Some("doubled")).unwrap();
    let err = graph.reduce_sum(doubled, 1, Some("err")).unwrap();
    graph.loss(err, None, LossReduction::Sum, Some("loss")).unwrap();
    graph.initialize().unwrap();

    graph.forward().unwrap();
    assert_eq!(scalar(&graph, "loss"), 12.);
    graph.backward().unwrap();
    assert_eq!(graph.diff_of("w").unwrap().unwrap(), &Tensor::full(2., [1, 3, 1, 1]));
}

#[test]
fn test_backward_through_layers() {
    // y = sigmoid(x·W + b)，loss = sum((y - t)²)
    let mut graph = Graph::new_with_seed(3);
    let x = graph.place_holder(&[1, 2], Some("x")).unwrap();
    let w = graph
        .variable(Initializer::fill(&[2, 1], 0.5), None, Some("w"))
        .unwrap();
    let b = graph
        .variable(Initializer::zeros(&[1]), None, Some("b"))
        .unwrap();
    let t = graph.place_holder(&[1, 1], Some("t")).unwrap();
    let xw = graph.matmul(x.output(), w, Some("xw")).unwrap();
    let z = graph.bias_add(xw, b, Some("z")).unwrap();
    let y = graph.sigmoid(z, Some("y")).unwrap();
    let se = graph.square_error(y, t.output(), Some("se")).unwrap();
    graph.loss(se, None, LossReduction::Sum, Some("loss")).unwrap();
    graph.initialize().unwrap();
    graph.write_values(x, &Tensor::new(&[1., -1.], &[1, 2])).unwrap();
    graph.write_values(t, &Tensor::new(&[1.], &[1, 1])).unwrap();

    graph.forward().unwrap();
    // z = 0 -> y = 0.5 -> loss = 0.25
    assert_eq!(scalar(&graph, "loss"), 0.25);
    graph.backward().unwrap();
    // dL/dz = 2(y-t)·y(1-y) = -0.25
    assert_eq!(diff_scalar(&graph, "b"), -0.25);
    assert_eq!(
        graph.diff_of("w").unwrap().unwrap().to_vec(),
        vec![-0.25, 0.25]
    );
    assert_eq!(graph.last_backward_pass_id(), 1);
}
