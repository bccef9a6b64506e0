/*
 * @Author       : 老董
 * @Description  : 复用器、开关与相位：前向只走被选中的分支，梯度也只流回被选中的分支
 */

use super::{diff_scalar, scalar};
use crate::assert_err;
use crate::nn::{Graph, GraphError, Initializer, LossReduction, MultiplexerHandle, PhaseBehaviour};

/// loss = mux(a, b)²，a=1，b=5
fn mux_graph() -> (Graph, MultiplexerHandle) {
    let mut graph = Graph::new();
    let a = graph
        .variable(Initializer::fill(&[1], 1.), None, Some("a"))
        .unwrap();
    let b = graph
        .variable(Initializer::fill(&[1], 5.), None, Some("b"))
        .unwrap();
    let mux = graph.multiplexer(&[a, b], Some("mux")).unwrap();
    let sq = graph.square(mux.output(), Some("sq")).unwrap();
    graph.loss(sq, None, LossReduction::Sum, Some("loss")).unwrap();
    graph.initialize().unwrap();
    (graph, mux)
}

#[test]
fn test_multiplexer_forwards_only_selected_branch() {
    let (mut graph, mux) = mux_graph();
    graph.select_input(mux, Some(0)).unwrap();
    graph.forward().unwrap();
    graph.backward().unwrap();
    assert_eq!(scalar(&graph, "loss"), 1.);
    assert_eq!(diff_scalar(&graph, "a"), 2.);
    assert_eq!(diff_scalar(&graph, "b"), 0.);
    assert_eq!(graph.get_node("b").unwrap().forward_count(), 0);

    graph.select_input(mux, Some(1)).unwrap();
    assert_eq!(graph.selected_input(mux).unwrap(), Some(1));
    graph.forward().unwrap();
    graph.backward().unwrap();
    assert_eq!(scalar(&graph, "loss"), 25.);
    assert_eq!(diff_scalar(&graph, "b"), 10.);
    // a本次没有执行，其累积的梯度保持不变
    assert_eq!(diff_scalar(&graph, "a"), 2.);
    assert_eq!(graph.get_node("sq").unwrap().backward_count(), 2);
}

#[test]
fn test_multiplexer_backward_follows_forwarded_input() {
    let (mut graph, mux) = mux_graph();
    graph.select_input(mux, Some(0)).unwrap();
    graph.forward().unwrap();
    // 前向之后改选，反向仍沿本次前向实际走过的分支回传
    graph.select_input(mux, Some(1)).unwrap();
    graph.backward().unwrap();
    assert_eq!(diff_scalar(&graph, "a"), 2.);
    assert_eq!(diff_scalar(&graph, "b"), 0.);

    graph.select_input(mux, None).unwrap();
    graph.backward().unwrap();
    assert_eq!(diff_scalar(&graph, "a"), 4.);
}

#[test]
fn test_unselected_multiplexer_blocks_downstream() {
    let (mut graph, mux) = mux_graph();
    assert_eq!(graph.selected_input(mux).unwrap(), None);
    graph.forward().unwrap();
    assert!(graph.loss_values().is_empty());
    assert_eq!(graph.get_node("loss").unwrap().forward_count(), 0);
    assert_eq!(graph.get_node("a").unwrap().forward_count(), 0);

    assert_err!(graph.select_input(mux, Some(2)), GraphError::InvalidOperation(_));
    graph.select_input(mux, Some(1)).unwrap();
    graph.forward().unwrap();
    assert_eq!(graph.loss_values(), vec![("loss".to_string(), 25.)]);
}

#[test]
fn test_disabled_switch_blocks_its_branch() {
    let mut graph = Graph::new();
    let w = graph
        .variable(Initializer::fill(&[1], 3.), None, Some("w"))
        .unwrap();
    let sw = graph.switch(w, Some("sw")).unwrap();
    let gated = graph.square(sw.output(), Some("gated")).unwrap();
    graph.loss(gated, None, LossReduction::Sum, Some("gated_loss")).unwrap();
    graph.loss(w, None, LossReduction::Sum, Some("plain_loss")).unwrap();
    graph.initialize().unwrap();

    graph.forward().unwrap();
    graph.backward().unwrap();
    assert_eq!(graph.loss_values().len(), 2);
    assert_eq!(diff_scalar(&graph, "w"), 7.);

    graph.set_enabled(sw, false).unwrap();
    assert!(!graph.is_enabled(sw).unwrap());
    graph.reset_gradients();
    graph.forward().unwrap();
    graph.backward().unwrap();
    assert_eq!(graph.loss_values(), vec![("plain_loss".to_string(), 3.)]);
    assert_eq!(diff_scalar(&graph, "w"), 1.);
    assert_eq!(graph.get_node("gated").unwrap().forward_count(), 1);
}

/// loss = phaseplexer(a@train, b@test)²，另有一个只属于"train"相位的损失
fn phase_graph() -> Graph {
    let mut graph = Graph::new();
    graph.define_phase("train", PhaseBehaviour::Train).unwrap();
    graph.define_phase("test", PhaseBehaviour::Inference).unwrap();
    graph.define_phase("other", PhaseBehaviour::Validation).unwrap();
    let a = graph
        .variable(Initializer::fill(&[1], 2.), None, Some("a"))
        .unwrap();
    let b = graph
        .variable(Initializer::fill(&[1], 3.), None, Some("b"))
        .unwrap();
    let p = graph
        .phaseplexer(&[(a, "train"), (b, "test")], Some("p"))
        .unwrap();
    let sq = graph.square(p, Some("sq")).unwrap();
    graph.loss(sq, None, LossReduction::Sum, Some("loss")).unwrap();

    graph.set_default_phases(&["train"]).unwrap();
    graph.loss(a, None, LossReduction::Sum, Some("train_loss")).unwrap();
    graph.set_default_phases(&[]).unwrap();
    graph
}

#[test]
fn test_phaseplexer_follows_active_phase() {
    let mut graph = phase_graph();
    graph.initialize().unwrap();

    // 未激活任何相位时取第一路
    graph.forward().unwrap();
    assert_eq!(scalar(&graph, "loss"), 4.);
    assert_eq!(graph.loss_values().len(), 2);

    graph.set_active_phase(Some("test")).unwrap();
    assert_eq!(graph.active_phase(), Some("test"));
    graph.forward().unwrap();
    assert_eq!(graph.loss_values(), vec![("loss".to_string(), 9.)]);
    assert_eq!(graph.get_node("train_loss").unwrap().forward_count(), 1);

    graph.set_active_phase(Some("train")).unwrap();
    graph.forward().unwrap();
    graph.backward().unwrap();
    assert_eq!(scalar(&graph, "loss"), 4.);
    // 2a + 1
    assert_eq!(diff_scalar(&graph, "a"), 5.);

    // 相位复用器不认识的相位：它和下游都不执行
    graph.set_active_phase(Some("other")).unwrap();
    graph.forward().unwrap();
    assert!(graph.loss_values().is_empty());

    assert_err!(graph.set_active_phase(Some("nope")), GraphError::PhaseNotFound(_));
}

#[test]
fn test_set_phase_for_nodes_extends_membership() {
    let mut graph = phase_graph();
    graph.set_phase_for_nodes("test", &["train_loss"]).unwrap();
    assert_err!(
        graph.set_phase_for_nodes("nope", &["train_loss"]),
        GraphError::PhaseNotFound(_)
    );
    graph.initialize().unwrap();

    graph.set_active_phase(Some("test")).unwrap();
    graph.forward().unwrap();
    assert_eq!(graph.loss_values().len(), 2);
    assert_eq!(scalar(&graph, "train_loss"), 2.);
}
