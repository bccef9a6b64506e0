/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : Graph 高层模型 I/O（save_model/load_model）
 *
 * 职责：完整模型的保存/加载（拓扑 JSON + 参数 bin）
 * - `{path}.json`：`GraphDescriptor`（serde_json，可读）
 * - `{path}.bin`：`ParamArchive`（bincode，紧凑），仅在包含权重或初始化内容时写出
 */

use super::super::error::GraphError;
use super::Graph;
use crate::nn::descriptor::GraphDescriptor;
use crate::nn::nodes::NodeType;
use crate::nn::terminal::{NodeInput, OutputRef};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// 保存选项：结构描述总是写出，权重和初始化器内容按需附带
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// 附带各`Variable`的当前值（未初始化时为其初始化器已有的内容）
    pub include_weights: bool,
    /// 附带各初始化器预先算好的内容
    pub include_inits: bool,
}

impl SaveOptions {
    pub const fn weights() -> Self {
        Self {
            include_weights: true,
            include_inits: false,
        }
    }

    pub const fn all() -> Self {
        Self {
            include_weights: true,
            include_inits: true,
        }
    }
}

/// 参数归档：节点名 -> 张量
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ParamArchive {
    weights: BTreeMap<String, Tensor>,
    inits: BTreeMap<String, Tensor>,
}

/// 模型文件路径：`path`本身以`.json`结尾时替换扩展名，否则直接追加后缀（保留`m.v2`这类带点的名字）
fn model_file(path: &Path, extension: &str) -> PathBuf {
    if path.extension().is_some_and(|e| e == "json") {
        return path.with_extension(extension);
    }
    let mut file: OsString = path.as_os_str().to_owned();
    file.push(".");
    file.push(extension);
    PathBuf::from(file)
}

impl Graph {
    /// 保存完整模型
    ///
    /// 自动生成（至多）两个文件：
    /// - `{path}.json`: 图的拓扑描述（可读）
    /// - `{path}.bin`: 参数数据（紧凑）
    ///
    /// # 示例
    /// ```ignore
    /// graph.save_model("models/xor", SaveOptions::weights())?;
    /// // 生成：models/xor.json + models/xor.bin
    /// ```
    pub fn save_model<P: AsRef<Path>>(&self, path: P, options: SaveOptions) -> Result<(), GraphError> {
        let path = path.as_ref();
        let json_path = model_file(path, "json");
        let bin_path = model_file(path, "bin");

        let mut descriptor = self.describe();

        // 1. 参数归档（有内容时才写出）
        if options.include_weights || options.include_inits {
            let archive = self.collect_params(options);
            std::fs::write(&bin_path, bincode::serialize(&archive)?)?;
            descriptor.params_file = bin_path
                .file_name()
                .map(|s| s.to_string_lossy().to_string());
        }

        // 2. 结构描述
        std::fs::write(&json_path, descriptor.to_json()?)?;
        log::info!(
            "模型{}已保存至{}（参数文件：{:?}）",
            self.name,
            json_path.display(),
            descriptor.params_file
        );
        Ok(())
    }

    fn collect_params(&self, options: SaveOptions) -> ParamArchive {
        let mut archive = ParamArchive::default();
        for node in self.nodes.values() {
            let initializer = match node.raw_node() {
                NodeType::Variable(variable) => {
                    if options.include_weights {
                        let current = self
                            .terminals
                            .get(&node.id())
                            .filter(|_| self.initialized)
                            .and_then(|outputs| outputs.first())
                            .map(|output| output.value().clone());
                        if let Some(weight) =
                            current.or_else(|| variable.initializer().content().cloned())
                        {
                            archive.weights.insert(node.name().to_string(), weight);
                        }
                    }
                    variable.initializer()
                }
                NodeType::DataGenerator(generator) => generator.initializer(),
                _ => continue,
            };
            if options.include_inits {
                if let Some(content) = initializer.content() {
                    archive.inits.insert(node.name().to_string(), content.clone());
                }
            }
        }
        archive
    }

    /// 从`{path}.json`（及其引用的参数文件）重建一张未初始化的图
    ///
    /// 保存的权重成为对应`Variable`的预计算初值；之后照常调用`initialize`即可。
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(model_file(path, "json"))?;
        let descriptor = GraphDescriptor::from_json(&json)?;

        let archive = match &descriptor.params_file {
            Some(file) => {
                let bin_path = model_file(path, "json").with_file_name(file);
                bincode::deserialize(&std::fs::read(bin_path)?)?
            }
            None => ParamArchive::default(),
        };

        let mut graph = Self::from_descriptor(&descriptor)?;
        graph.restore_params(archive)?;
        log::info!(
            "已从{}载入模型{}（{}个节点）",
            path.display(),
            graph.name,
            graph.nodes.len()
        );
        Ok(graph)
    }

    /// 按描述符重建图结构：先登记全部节点（输入未绑定），再按名字逐一绑定输入
    pub fn from_descriptor(descriptor: &GraphDescriptor) -> Result<Self, GraphError> {
        let mut graph = match descriptor.seed {
            Some(seed) => Self::with_name_and_seed(&descriptor.name, seed),
            None => Self::with_name(&descriptor.name),
        };
        for phase in &descriptor.phases {
            graph.define_phase(&phase.name, phase.behaviour)?;
        }
        for solver in &descriptor.solvers {
            graph.add_solver(solver.build())?;
        }

        for node in &descriptor.nodes {
            let raw_node = NodeType::from_descriptor(&node.node_type, node.inputs.len());
            let inputs = vec![NodeInput::default(); node.inputs.len()];
            let id = graph.insert_node(raw_node, inputs, node.phases.clone(), Some(&node.name))?;
            if id.0 != node.id {
                log::debug!("节点{}的id由{}重排为{id}", node.name, node.id);
            }
        }

        for node in &descriptor.nodes {
            for (slot, input) in node.inputs.iter().enumerate() {
                if let Some(input) = input {
                    let source = OutputRef::new(graph.node_id(&input.node)?, input.index);
                    graph.bind_input(&node.name, slot, source)?;
                }
            }
        }
        Ok(graph)
    }

    fn restore_params(&mut self, archive: ParamArchive) -> Result<(), GraphError> {
        let ParamArchive { weights, mut inits } = archive;
        // 权重优先于初始化内容
        for (name, weight) in weights {
            inits.insert(name, weight);
        }
        for (name, content) in inits {
            let id = self.node_id(&name)?;
            let node = self.get_node_by_id_mut(id)?;
            let initializer = match node.raw_node_mut() {
                NodeType::Variable(variable) => variable.initializer_mut(),
                NodeType::DataGenerator(generator) => generator.initializer_mut(),
                _ => {
                    return Err(GraphError::InvalidOperation(format!(
                        "参数文件中的`{name}`不是Variable或DataGenerator节点"
                    )))
                }
            };
            initializer.set_content(content)?;
        }
        Ok(())
    }
}
