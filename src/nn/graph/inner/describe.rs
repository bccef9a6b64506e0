/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : Graph describe/summary 相关方法
 */

use super::super::error::GraphError;
use super::Graph;
use crate::nn::descriptor::{
    GraphDescriptor, InputDescriptor, NodeDescriptor, NodeTypeDescriptor, PhaseDescriptor,
};
use crate::nn::nodes::{NodeHandle, TraitNode};
use crate::nn::terminal::NodeOutput;
use std::path::Path;

/// 摘要表格中的一行
struct SummaryRow {
    name: String,
    kind: &'static str,
    shape: String,
    params: String,
    inputs: String,
    phases: String,
}

impl Graph {
    // ========== 图描述（describe）==========

    /// 导出图的描述符（用于保存、代码生成、调试）
    ///
    /// # 示例
    /// ```ignore
    /// let descriptor = graph.describe();
    /// println!("{}", descriptor.to_json()?);
    /// ```
    pub fn describe(&self) -> GraphDescriptor {
        let mut descriptor = GraphDescriptor::new(&self.name);
        descriptor.seed = self.seed;
        descriptor.phases = self
            .phases
            .iter()
            .map(|(name, &behaviour)| PhaseDescriptor {
                name: name.clone(),
                behaviour,
            })
            .collect();
        descriptor.solvers = self.solvers.values().map(|s| s.descriptor()).collect();

        for node in self.nodes.values() {
            let inputs = node
                .inputs()
                .iter()
                .map(|input| {
                    let source = input.source()?;
                    let producer = self.nodes.get(&source.node)?;
                    Some(InputDescriptor {
                        node: producer.name().to_string(),
                        index: source.index,
                    })
                })
                .collect();
            descriptor.add_node(NodeDescriptor {
                id: node.id().0,
                name: node.name().to_string(),
                node_type: node.raw_node().descriptor(),
                inputs,
                phases: node.phases().to_vec(),
            });
        }
        descriptor
    }

    // ========== 模型摘要（summary）==========

    /// 打印模型摘要
    pub fn summary(&self) {
        println!("{}", self.summary_string());
    }

    /// 将模型摘要保存到文件
    ///
    /// 根据文件扩展名自动选择格式：
    /// - `.md` → Markdown 表格
    /// - 其他（`.txt` 等）→ Unicode 文本表格
    pub fn save_summary<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphError> {
        let path = path.as_ref();
        let summary = match path.extension().and_then(|e| e.to_str()) {
            Some("md") => self.summary_markdown(),
            _ => self.summary_string(),
        };
        std::fs::write(path, summary)?;
        Ok(())
    }

    /// 返回模型摘要的 Markdown 格式字符串
    pub fn summary_markdown(&self) -> String {
        let mut output = format!("# 模型摘要: {}\n\n", self.name);
        output.push_str("| 节点名称 | 类型 | 输出形状 | 参数量 | 输入 | 相位 |\n");
        output.push_str("|----------|------|----------|--------|------|------|\n");
        for row in self.summary_rows() {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                row.name, row.kind, row.shape, row.params, row.inputs, row.phases
            ));
        }
        output.push_str(&format!(
            "\n**可训练参数**: {}\n",
            Self::format_number(self.describe().total_params())
        ));
        output
    }

    /// 返回模型摘要字符串（Unicode 文本表格，用于控制台输出）
    pub fn summary_string(&self) -> String {
        let rows = self.summary_rows();
        let headers = ["节点名称", "类型", "输出形状", "参数量", "输入", "相位"];
        let cells = |row: &SummaryRow| -> [String; 6] {
            [
                row.name.clone(),
                row.kind.to_string(),
                row.shape.clone(),
                row.params.clone(),
                row.inputs.clone(),
                row.phases.clone(),
            ]
        };

        // 计算各列宽度
        let mut widths = headers.map(Self::display_width);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(cells(row)) {
                *width = (*width).max(Self::display_width(&cell));
            }
        }

        let line = |left: &str, mid: &str, right: &str| {
            let segments = widths.iter().map(|w| "─".repeat(w + 2)).collect::<Vec<_>>();
            format!("{left}{}{right}\n", segments.join(mid))
        };
        let render = |values: &[String]| {
            let padded = values
                .iter()
                .zip(&widths)
                .map(|(v, &w)| format!(" {v}{} ", " ".repeat(w - Self::display_width(v))))
                .collect::<Vec<_>>();
            format!("│{}│\n", padded.join("│"))
        };

        let mut output = line("┌", "┬", "┐");
        output.push_str(&render(&headers.map(str::to_string)));
        output.push_str(&line("├", "┼", "┤"));
        for row in &rows {
            output.push_str(&render(&cells(row)));
        }
        output.push_str(&line("└", "┴", "┘"));
        output.push_str(&format!(
            "图: {}  节点数: {}  可训练参数: {}  求解器: {}\n",
            self.name,
            self.nodes.len(),
            Self::format_number(self.describe().total_params()),
            self.solver_names().join(", ")
        ));
        output
    }

    fn summary_rows(&self) -> Vec<SummaryRow> {
        self.nodes
            .values()
            .map(|node| SummaryRow {
                name: node.name().to_string(),
                kind: node.kind(),
                shape: self.output_shapes_string(node),
                params: match node.raw_node().descriptor() {
                    NodeTypeDescriptor::Variable { dims, .. } => {
                        Self::format_number(dims.iter().product())
                    }
                    _ => "-".to_string(),
                },
                inputs: self.input_names_string(node),
                phases: if node.phases().is_empty() {
                    "*".to_string()
                } else {
                    node.phases().join(", ")
                },
            })
            .collect()
    }

    /// 已初始化时为各输出的形状，否则为"-"
    fn output_shapes_string(&self, node: &NodeHandle) -> String {
        match self.terminals.get(&node.id()) {
            Some(outputs) if self.initialized => outputs
                .iter()
                .map(|o: &NodeOutput| format!("{:?}", o.dims()))
                .collect::<Vec<_>>()
                .join(" "),
            _ => "-".to_string(),
        }
    }

    fn input_names_string(&self, node: &NodeHandle) -> String {
        if node.inputs().is_empty() {
            return "-".to_string();
        }
        node.inputs()
            .iter()
            .map(|input| match input.source() {
                Some(source) => {
                    let name = self
                        .nodes
                        .get(&source.node)
                        .map_or("?", |n| n.name());
                    if source.index == 0 {
                        name.to_string()
                    } else {
                        format!("{name}:{}", source.index)
                    }
                }
                None => "<未绑定>".to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// 格式化数字为千分位分隔形式
    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        for (i, c) in s.chars().rev().enumerate() {
            if i > 0 && i % 3 == 0 {
                result.push(',');
            }
            result.push(c);
        }
        result.chars().rev().collect()
    }

    /// 计算字符串显示宽度（考虑中文字符）
    fn display_width(s: &str) -> usize {
        s.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
    }
}
