/*
 * @Author       : 老董
 * @Date         : 2024-01-31 20:23:53
 * @LastEditors  : 老董
 * @LastEditTime : 2026-02-12 21:05:11
 * @Description  : 负责计算图（computational graph）的构建、执行与训练
 */

mod descriptor;
mod graph;
mod initializer;
mod nodes;
mod session;
mod solver;
mod terminal;

pub use descriptor::{
    GraphDescriptor, InputDescriptor, NodeDescriptor, NodeTypeDescriptor, PhaseDescriptor,
};
pub use graph::{
    BackwardType, ForwardType, Graph, GraphError, PassContext, PhaseBehaviour, SaveOptions,
};
pub use initializer::{InitKind, Initializer};
pub use nodes::raw_node::{
    ActivationMode, BatchNormMode, BatchNormParams, Conv2dParams, ElementwiseOp, LiftingMode,
    LossReduction, PoolingParams, ReduceOp,
};
pub use nodes::{
    MultiplexerHandle, NodeHandle, NodeId, NodeType, PlaceholderHandle, SwitchHandle, TraitNode,
};
pub use session::{ExecutionContext, Session};
pub use solver::{
    AdadeltaParams, AdadeltaSolver, AdamParams, AdamSolver, GainParams, GainSolver, SgdParams,
    SgdSolver, Solver, SolverDescriptor, SolverKind,
};
pub use terminal::{NodeInput, NodeOutput, OutputRef};

#[cfg(test)]
mod tests;
