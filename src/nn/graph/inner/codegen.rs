/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : Graph 代码生成：把当前的图渲染为一段等价的图定义代码
 *                 （求解器、相位声明、按创建顺序的各节点构建调用，以及已设置的控制状态）
 */

use super::super::error::GraphError;
use super::Graph;
use crate::nn::nodes::{NodeHandle, NodeId, NodeType, TraitNode};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "false", "fn", "for", "if",
    "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "self",
    "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where", "while",
];

impl Graph {
    /// 渲染为构建本图的 Rust 代码（以`graph`为图变量名）
    ///
    /// 只反映已经设置好的参数与控制状态；存在未绑定的输入时返回`UnboundInput`。
    pub fn to_code(&self) -> Result<String, GraphError> {
        let idents = self.code_identifiers();
        let mut code = String::new();

        // 1. 图与相位
        let constructor = match self.seed {
            Some(seed) => format!("Graph::with_name_and_seed({:?}, {seed})", self.name),
            None => format!("Graph::with_name({:?})", self.name),
        };
        writeln!(code, "let mut graph = {constructor};").map_err(fmt_error)?;
        for (phase, behaviour) in &self.phases {
            writeln!(code, "graph.define_phase({phase:?}, PhaseBehaviour::{behaviour:?})?;")
                .map_err(fmt_error)?;
        }

        // 2. 求解器
        for solver in self.solvers.values() {
            writeln!(code, "graph.{}?;", solver.to_code()).map_err(fmt_error)?;
        }

        // 3. 节点（按创建顺序）
        for node in self.nodes.values() {
            let inputs = node
                .inputs()
                .iter()
                .enumerate()
                .map(|(slot, input)| {
                    let source = input.source().ok_or_else(|| GraphError::UnboundInput {
                        node: node.name().to_string(),
                        slot,
                    })?;
                    self.input_expression(source.node, source.index, &idents)
                })
                .collect::<Result<Vec<_>, GraphError>>()?;

            let ident = &idents[&node.id()];
            let call = node.raw_node().to_code(&inputs, node.name());
            let binding = match node.raw_node() {
                NodeType::SoftmaxLoss(_) => format!("({ident}, {ident}_1)"),
                _ => ident.clone(),
            };
            writeln!(code, "let {binding} = graph.{call}?;").map_err(fmt_error)?;
            self.write_control_state(&mut code, node, ident)?;
        }
        Ok(code)
    }

    /// 复用器的选择、关闭的开关、节点的相位标记
    fn write_control_state(&self, code: &mut String, node: &NodeHandle, ident: &str) -> Result<(), GraphError> {
        match node.raw_node() {
            NodeType::Multiplexer(mux) => {
                if let Some(index) = mux.selected() {
                    writeln!(code, "graph.select_input({ident}, Some({index}))?;").map_err(fmt_error)?;
                }
            }
            NodeType::Switch(switch) if !switch.enabled() => {
                writeln!(code, "graph.set_enabled({ident}, false)?;").map_err(fmt_error)?;
            }
            _ => {}
        }
        for phase in node.phases() {
            writeln!(code, "graph.set_phase_for_nodes({phase:?}, &[{:?}])?;", node.name())
                .map_err(fmt_error)?;
        }
        Ok(())
    }

    /// 某个输出端子在生成代码中的表达式
    fn input_expression(
        &self,
        node: NodeId,
        index: usize,
        idents: &BTreeMap<NodeId, String>,
    ) -> Result<String, GraphError> {
        let producer = self.get_node_by_id(node)?;
        let ident = idents.get(&node).ok_or(GraphError::NodeIdNotFound(node))?;
        Ok(match producer.raw_node() {
            // 这几类构建方法返回的是控制句柄
            NodeType::PlaceHolder(_) | NodeType::Multiplexer(_) | NodeType::Switch(_) => {
                format!("{ident}.output()")
            }
            _ if index > 0 => format!("{ident}_{index}"),
            _ => ident.clone(),
        })
    }

    /// 节点名 -> 合法且互不相同的变量名
    fn code_identifiers(&self) -> BTreeMap<NodeId, String> {
        let mut used = BTreeSet::new();
        self.nodes
            .values()
            .map(|node| {
                let mut ident = sanitize_identifier(node.name());
                if !used.insert(ident.clone()) {
                    ident = format!("{ident}_{}", node.id().0);
                    used.insert(ident.clone());
                }
                (node.id(), ident)
            })
            .collect()
    }
}

fn sanitize_identifier(name: &str) -> String {
    let mut ident = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect::<String>();
    if ident.is_empty()
        || ident.starts_with(|c: char| c.is_ascii_digit())
        || RUST_KEYWORDS.contains(&ident.as_str())
    {
        ident.insert_str(0, "n_");
    }
    ident
}

fn fmt_error(e: std::fmt::Error) -> GraphError {
    GraphError::ComputationError(format!("生成代码失败: {e}"))
}
