/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 会话：驱动计算图的外层接口（初始化、前向/反向、求解器、控制状态、训练循环）。
 *                 取消只在两次迭代之间检查，单次传播一旦开始就会完整执行。
 */

use crate::nn::{
    Graph, GraphError, MultiplexerHandle, NodeHandle, PlaceholderHandle, SaveOptions, SwitchHandle,
};
use crate::tensor::Tensor;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 执行上下文：调试级别、训练进度以及协作式取消标志
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub debug_level: u32,
    pub current_epoch: usize,
    pub current_iteration: usize,
    /// 可在其他线程中置位，`Session::run`在每次迭代开始前检查
    pub quit: Arc<AtomicBool>,
}

impl ExecutionContext {
    pub fn should_quit(&self) -> bool {
        self.quit.load(Ordering::Relaxed)
    }

    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::Relaxed);
    }
}

/// 会话：持有一张计算图及其执行上下文
#[derive(Debug)]
pub struct Session {
    graph: Graph,
    context: ExecutionContext,
}

impl Session {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            context: ExecutionContext::default(),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// 结构编辑只能在初始化之前进行
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    // ========== 传播 ==========

    pub fn initialize(&mut self, context: ExecutionContext) -> Result<(), GraphError> {
        self.context = context;
        self.graph.initialize()
    }

    pub fn forward(&mut self) -> Result<(), GraphError> {
        self.graph.forward()
    }

    pub fn backward(&mut self) -> Result<(), GraphError> {
        self.graph.backward()
    }

    pub fn reset_gradients(&mut self) {
        self.graph.reset_gradients();
    }

    /// None：应用所有求解器；Some(names)：只应用给定的求解器组
    pub fn apply_solvers(&mut self, names: Option<&[&str]>) -> Result<(), GraphError> {
        self.graph.apply_solvers(names)
    }

    // ========== 查询与控制 ==========

    pub fn get_node(&self, name: &str) -> Result<&NodeHandle, GraphError> {
        self.graph.get_node(name)
    }

    pub fn value_of(&self, name: &str) -> Result<&Tensor, GraphError> {
        self.graph.value_of(name)
    }

    pub fn set_phase(&mut self, phase: Option<&str>) -> Result<(), GraphError> {
        self.graph.set_active_phase(phase)
    }

    pub fn multiplexer(&self, name: &str) -> Result<MultiplexerHandle, GraphError> {
        self.graph.multiplexer_handle(name)
    }

    pub fn switch(&self, name: &str) -> Result<SwitchHandle, GraphError> {
        self.graph.switch_handle(name)
    }

    pub fn placeholder(&self, name: &str) -> Result<PlaceholderHandle, GraphError> {
        self.graph.placeholder_handle(name)
    }

    pub fn select_input(&mut self, mux: MultiplexerHandle, index: Option<usize>) -> Result<(), GraphError> {
        self.graph.select_input(mux, index)
    }

    pub fn set_enabled(&mut self, switch: SwitchHandle, enabled: bool) -> Result<(), GraphError> {
        self.graph.set_enabled(switch, enabled)
    }

    pub fn write_values(&mut self, placeholder: PlaceholderHandle, values: &Tensor) -> Result<(), GraphError> {
        self.graph.write_values(placeholder, values)
    }

    // ========== 训练循环 ==========

    /// 以`phase`运行`iterations`次“前向 -> 反向 -> 应用求解器 -> 梯度清零”，
    /// 返回每次迭代中各损失节点的值。取消标志置位后，在下一次迭代开始前停止。
    pub fn run(
        &mut self,
        phase: Option<&str>,
        iterations: usize,
        solver_groups: Option<&[&str]>,
    ) -> Result<Vec<BTreeMap<String, f32>>, GraphError> {
        self.graph.set_active_phase(phase)?;
        let mut history = Vec::with_capacity(iterations);
        for _ in 0..iterations {
            if self.context.should_quit() {
                log::info!(
                    "第{}次迭代前收到取消请求，训练循环提前结束",
                    self.context.current_iteration
                );
                break;
            }
            self.graph.forward()?;
            self.graph.backward()?;
            self.graph.apply_solvers(solver_groups)?;
            self.graph.reset_gradients();

            let losses = self.graph.loss_values().into_iter().collect::<BTreeMap<_, _>>();
            if self.context.debug_level > 0 {
                log::debug!("迭代{}：{losses:?}", self.context.current_iteration);
            }
            history.push(losses);
            self.context.current_iteration += 1;
        }
        Ok(history)
    }

    // ========== 持久化 ==========

    pub fn save<P: AsRef<Path>>(&self, path: P, options: SaveOptions) -> Result<(), GraphError> {
        self.graph.save_model(path, options)
    }

    /// 载入的图尚未初始化，需要再调用`initialize`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        Ok(Self::new(Graph::load_model(path)?))
    }
}
