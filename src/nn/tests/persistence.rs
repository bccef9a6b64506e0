/*
 * @Author       : 老董
 * @Description  : 图描述、模型保存/加载、代码生成与摘要
 */

use crate::assert_err;
use crate::nn::{
    AdamParams, Graph, GraphDescriptor, GraphError, InputDescriptor, Initializer, PhaseBehaviour,
    SaveOptions,
};
use crate::tensor::Tensor;
use std::path::PathBuf;

/// 线性层 -> (relu | tanh)复用器 -> softmax交叉熵；复用器选中tanh
fn classifier_graph() -> Graph {
    let mut graph = Graph::with_name_and_seed("classifier", 11);
    graph.define_phase("train", PhaseBehaviour::Train).unwrap();
    graph.adam_solver(AdamParams::default(), "adam").unwrap();
    let x = graph.place_holder(&[2, 3], Some("x")).unwrap();
    let label = graph.place_holder(&[2, 2], Some("label")).unwrap();
    let w = graph
        .variable(Initializer::random_normal(&[3, 2], 0., 0.5), Some("adam"), Some("w"))
        .unwrap();
    let b = graph
        .variable(Initializer::zeros(&[2]), Some("adam"), Some("b"))
        .unwrap();
    let xw = graph.matmul(x.output(), w, Some("xw")).unwrap();
    let logits = graph.bias_add(xw, b, Some("logits")).unwrap();
    let act_a = graph.relu(logits, Some("act_a")).unwrap();
    let act_b = graph.tanh(logits, Some("act_b")).unwrap();
    let mux = graph.multiplexer(&[act_a, act_b], Some("mux")).unwrap();
    graph.select_input(mux, Some(1)).unwrap();
    graph
        .softmax_loss(mux.output(), label.output(), Some("softmax"))
        .unwrap();
    graph.set_phase_for_nodes("train", &["softmax"]).unwrap();
    graph
}

fn feed(graph: &mut Graph) {
    let x = graph.placeholder_handle("x").unwrap();
    let label = graph.placeholder_handle("label").unwrap();
    graph
        .write_values(x, &Tensor::new(&[1., 0., -1., 0.5, 2., 0.], &[2, 3]))
        .unwrap();
    graph
        .write_values(label, &Tensor::new(&[1., 0., 0., 1.], &[2, 2]))
        .unwrap();
}

fn temp_model_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("deep_flow_{tag}_{}", std::process::id()))
}

#[test]
fn test_descriptor_json_round_trip() {
    let graph = classifier_graph();
    let descriptor = graph.describe();
    assert_eq!(descriptor.name, "classifier");
    assert_eq!(descriptor.seed, Some(11));
    assert_eq!(descriptor.total_params(), 8);
    assert_eq!(
        descriptor.node("mux").unwrap().inputs[1],
        Some(InputDescriptor {
            node: "act_b".to_string(),
            index: 0
        })
    );
    assert_eq!(descriptor.node("softmax").unwrap().phases, vec!["train"]);

    let json = descriptor.to_json().unwrap();
    assert_eq!(GraphDescriptor::from_json(&json).unwrap(), descriptor);

    // 由描述重建的图再次描述，结果不变（包括复用器的选择）
    let rebuilt = Graph::from_descriptor(&descriptor).unwrap();
    assert_eq!(rebuilt.describe(), descriptor);
}

#[test]
fn test_save_and_load_with_weights() {
    let mut graph = classifier_graph();
    graph.initialize().unwrap();
    feed(&mut graph);
    graph.forward().unwrap();
    graph.backward().unwrap();
    graph.apply_solvers(None).unwrap();
    graph.forward().unwrap();

    let path = temp_model_path("weights");
    graph.save_model(&path, SaveOptions::weights()).unwrap();
    assert!(path.with_extension("bin").exists());

    let mut loaded = Graph::load_model(&path).unwrap();
    loaded.initialize().unwrap();
    assert_eq!(loaded.value_of("w").unwrap(), graph.value_of("w").unwrap());
    feed(&mut loaded);
    loaded.forward().unwrap();
    assert_eq!(loaded.value_of("mux").unwrap(), graph.value_of("mux").unwrap());
    assert_eq!(loaded.loss_values(), graph.loss_values());
}

#[test]
fn test_dotted_model_name_keeps_its_suffix() {
    let mut graph = classifier_graph();
    graph.initialize().unwrap();
    let path = temp_model_path("dotted").with_extension("v2");
    graph.save_model(&path, SaveOptions::weights()).unwrap();

    let file_name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(path.with_file_name(format!("{file_name}.json")).exists());
    assert!(path.with_file_name(format!("{file_name}.bin")).exists());
    // `.v2`没有被当成扩展名替换掉
    assert!(!path.with_extension("json").exists());

    let mut loaded = Graph::load_model(&path).unwrap();
    loaded.initialize().unwrap();
    assert_eq!(loaded.value_of("w").unwrap(), graph.value_of("w").unwrap());

    // 直接给出`.json`路径也能加载
    let mut by_json = Graph::load_model(path.with_file_name(format!("{file_name}.json"))).unwrap();
    by_json.initialize().unwrap();
    assert_eq!(by_json.value_of("w").unwrap(), graph.value_of("w").unwrap());
}

#[test]
fn test_structure_only_save_relies_on_seed() {
    let graph = classifier_graph();
    let path = temp_model_path("structure");
    graph.save_model(&path, SaveOptions::default()).unwrap();

    let json = std::fs::read_to_string(path.with_extension("json")).unwrap();
    assert!(GraphDescriptor::from_json(&json).unwrap().params_file.is_none());
    assert!(!path.with_extension("bin").exists());

    // 相同种子的图按相同顺序抽取随机数，初值一致
    let mut original = graph;
    original.initialize().unwrap();
    let mut loaded = Graph::load_model(&path).unwrap();
    loaded.initialize().unwrap();
    assert_eq!(loaded.value_of("w").unwrap(), original.value_of("w").unwrap());
}

#[test]
fn test_saved_inits_restore_initial_values() {
    let mut graph = classifier_graph();
    graph.initialize().unwrap();
    let initial = graph.value_of("w").unwrap().clone();
    feed(&mut graph);
    graph.forward().unwrap();
    graph.backward().unwrap();
    graph.apply_solvers(None).unwrap();
    assert_ne!(graph.value_of("w").unwrap(), &initial);

    let path = temp_model_path("inits");
    let options = SaveOptions {
        include_weights: false,
        include_inits: true,
    };
    graph.save_model(&path, options).unwrap();
    let mut loaded = Graph::load_model(&path).unwrap();
    loaded.initialize().unwrap();
    assert_eq!(loaded.value_of("w").unwrap(), &initial);
}

#[test]
fn test_to_code_renders_builder_calls() {
    let graph = classifier_graph();
    let code = graph.to_code().unwrap();
    for line in [
        "let mut graph = Graph::with_name_and_seed(\"classifier\", 11);",
        "graph.define_phase(\"train\", PhaseBehaviour::Train)?;",
        "let w = graph.variable(Initializer::random_normal(",
        "let logits = graph.bias_add(xw, b, Some(\"logits\"))?;",
        "let mux = graph.multiplexer(&[act_a, act_b], Some(\"mux\"))?;",
        "graph.select_input(mux, Some(1))?;",
        "let (softmax, softmax_1) = graph.softmax_loss(mux.output(), label.output(), Some(\"softmax\"))?;",
        "graph.set_phase_for_nodes(\"train\", &[\"softmax\"])?;",
    ] {
        assert!(code.contains(line), "缺少`{line}`：\n{code}");
    }
}

#[test]
fn test_to_code_rejects_unbound_inputs() {
    let mut graph = Graph::new();
    let x = graph.place_holder(&[2], Some("x")).unwrap();
    graph.square(x.output(), Some("sq")).unwrap();
    graph.remove_nodes(&["x"]).unwrap();
    assert_err!(graph.to_code(), GraphError::UnboundInput { .. });
}

#[test]
fn test_summary_lists_every_node() {
    let graph = classifier_graph();
    let summary = graph.summary_string();
    for name in ["x", "w", "logits", "mux", "softmax"] {
        assert!(summary.contains(name), "{summary}");
    }
    assert!(summary.contains("Variable"));

    let markdown = graph.summary_markdown();
    assert!(markdown.contains("| w |"));
    assert!(markdown.contains("**可训练参数**: 8"));
}
