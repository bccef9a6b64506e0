/*
 * @Author       : 老董
 * @Description  : 多个求解器分组更新参数；用SGD训练回归图
 */

use super::{diff_scalar, regression_graph, scalar};
use crate::assert_err;
use crate::nn::{AdamParams, Graph, GraphError, Initializer, LossReduction, SgdParams};
use approx::assert_abs_diff_eq;

/// loss = (d + g)²，d绑定求解器"d"，g绑定求解器"g"
fn two_group_graph() -> Graph {
    let mut graph = Graph::new();
    let sgd = SgdParams {
        learning_rate: 0.1,
        momentum: 0.,
    };
    graph.sgd_solver(sgd, "d").unwrap();
    graph.sgd_solver(sgd, "g").unwrap();
    let d = graph
        .variable(Initializer::fill(&[1], 1.), Some("d"), Some("wd"))
        .unwrap();
    let g = graph
        .variable(Initializer::fill(&[1], 2.), Some("g"), Some("wg"))
        .unwrap();
    let sum = graph.add(d, g, Some("sum")).unwrap();
    let sq = graph.square(sum, Some("sq")).unwrap();
    graph.loss(sq, None, LossReduction::Sum, Some("loss")).unwrap();
    graph.initialize().unwrap();
    graph
}

#[test]
fn test_apply_only_selected_solver_group() {
    let mut graph = two_group_graph();
    assert_eq!(graph.solver_names(), vec!["d", "g"]);
    graph.forward().unwrap();
    graph.backward().unwrap();
    assert_eq!(scalar(&graph, "loss"), 9.);
    assert_eq!(diff_scalar(&graph, "wg"), 6.);

    graph.apply_solvers(Some(&["d"])).unwrap();
    assert_abs_diff_eq!(scalar(&graph, "wd"), 0.4, epsilon = 1e-6);
    assert_eq!(scalar(&graph, "wg"), 2.);
    // 应用求解器不会清零梯度
    assert_eq!(diff_scalar(&graph, "wg"), 6.);

    graph.apply_solvers(None).unwrap();
    assert_abs_diff_eq!(scalar(&graph, "wd"), -0.2, epsilon = 1e-6);
    assert_abs_diff_eq!(scalar(&graph, "wg"), 1.4, epsilon = 1e-6);
}

#[test]
fn test_repeated_solver_name_applies_once() {
    let mut graph = two_group_graph();
    graph.forward().unwrap();
    graph.backward().unwrap();
    graph.apply_solvers(Some(&["d", "d"])).unwrap();
    // 与只给出一次"d"的结果相同：1 - 0.1 * 6
    assert_abs_diff_eq!(scalar(&graph, "wd"), 0.4, epsilon = 1e-6);
    assert_eq!(scalar(&graph, "wg"), 2.);
}

#[test]
fn test_unknown_solver_group_is_rejected() {
    let mut graph = two_group_graph();
    graph.forward().unwrap();
    graph.backward().unwrap();
    assert_err!(
        graph.apply_solvers(Some(&["d", "nope"])),
        GraphError::SolverNotFound(_)
    );
    // 校验先于任何更新
    assert_eq!(scalar(&graph, "wd"), 1.);
}

#[test]
fn test_variable_without_solver_is_left_alone() {
    let mut graph = Graph::new();
    graph
        .adam_solver(AdamParams::default(), "adam")
        .unwrap();
    let w = graph
        .variable(Initializer::fill(&[1], 1.), Some("adam"), Some("w"))
        .unwrap();
    let frozen = graph
        .variable(Initializer::fill(&[1], 1.), None, Some("frozen"))
        .unwrap();
    let sum = graph.add(w, frozen, Some("sum")).unwrap();
    graph.loss(sum, None, LossReduction::Sum, Some("loss")).unwrap();
    graph.initialize().unwrap();

    graph.forward().unwrap();
    graph.backward().unwrap();
    graph.apply_solvers(None).unwrap();
    assert!(scalar(&graph, "w") < 1.);
    assert_eq!(scalar(&graph, "frozen"), 1.);
}

#[test]
fn test_sgd_training_converges() {
    let (mut graph, _) = regression_graph();
    let mut losses = Vec::new();
    for _ in 0..60 {
        graph.forward().unwrap();
        graph.backward().unwrap();
        graph.apply_solvers(None).unwrap();
        graph.reset_gradients();
        losses.push(scalar(&graph, "loss"));
    }
    assert!(losses.windows(2).all(|w| w[1] < w[0]));
    assert_abs_diff_eq!(scalar(&graph, "w"), 1., epsilon = 1e-3);
}
