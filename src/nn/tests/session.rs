/*
 * @Author       : 老董
 * @Description  : 会话：执行上下文、训练循环、取消、按名取控制句柄
 */

use super::regression_graph;
use crate::nn::{ExecutionContext, Graph, Initializer, LossReduction, SaveOptions, Session};
use crate::tensor::Tensor;

fn regression_session() -> Session {
    let (graph, _) = regression_graph();
    Session::new(graph)
}

#[test]
fn test_run_returns_loss_history() {
    let mut session = regression_session();
    let history = session.run(None, 20, None).unwrap();
    assert_eq!(history.len(), 20);
    assert_eq!(history[0]["loss"], 4.);
    assert!(history.windows(2).all(|w| w[1]["loss"] < w[0]["loss"]));
    assert_eq!(session.context().current_iteration, 20);
}

#[test]
fn test_quit_request_stops_the_loop() {
    let mut session = regression_session();
    // 标志可以交给其他线程，这里直接置位
    let context = session.context().clone();
    context.request_quit();
    assert!(session.context().should_quit());
    let history = session.run(None, 10, None).unwrap();
    assert!(history.is_empty());
    assert_eq!(session.value_of("w").unwrap().number(), Some(3.));
}

#[test]
fn test_control_handles_by_name() {
    let mut graph = Graph::new();
    let a = graph
        .variable(Initializer::fill(&[1], 1.), None, Some("a"))
        .unwrap();
    let b = graph
        .variable(Initializer::fill(&[1], 2.), None, Some("b"))
        .unwrap();
    let mux = graph.multiplexer(&[a, b], Some("mux")).unwrap();
    let sw = graph.switch(mux.output(), Some("sw")).unwrap();
    let t = graph.place_holder(&[1], Some("t")).unwrap();
    let se = graph.square_error(sw.output(), t.output(), Some("se")).unwrap();
    graph.loss(se, None, LossReduction::Sum, Some("loss")).unwrap();

    let mut session = Session::new(graph);
    let context = ExecutionContext {
        debug_level: 1,
        ..Default::default()
    };
    session.initialize(context).unwrap();
    assert_eq!(session.context().debug_level, 1);

    let mux = session.multiplexer("mux").unwrap();
    let sw = session.switch("sw").unwrap();
    let t = session.placeholder("t").unwrap();
    assert!(session.multiplexer("sw").is_err());

    session.select_input(mux, Some(1)).unwrap();
    session.write_values(t, &Tensor::new(&[5.], &[1])).unwrap();
    session.forward().unwrap();
    assert_eq!(session.value_of("loss").unwrap().number(), Some(9.));
    assert_eq!(session.get_node("a").unwrap().forward_count(), 0);

    session.set_enabled(sw, false).unwrap();
    session.forward().unwrap();
    assert!(session.graph().loss_values().is_empty());
}

#[test]
fn test_session_save_and_load() {
    let mut session = regression_session();
    session.run(None, 5, None).unwrap();
    let trained = session.value_of("w").unwrap().clone();

    let path = std::env::temp_dir().join(format!("deep_flow_session_{}", std::process::id()));
    session.save(&path, SaveOptions::all()).unwrap();

    let mut loaded = Session::load(&path).unwrap();
    loaded.initialize(ExecutionContext::default()).unwrap();
    assert_eq!(loaded.value_of("w").unwrap(), &trained);
    assert_eq!(loaded.graph().solver_names(), vec!["sgd"]);
}
