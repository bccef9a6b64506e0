/*
 * @Author       : 老董
 * @Date         : 2026-02-06
 * @Description  : 求解器：读取可训练参数累积的梯度，按各自的规则原地更新参数值。
 *                 每个求解器有一个名字，参数（`Variable`）通过该名字绑定到求解器；
 *                 多个求解器可以共存（如GAN中生成器与判别器各用一个），互不干扰。
 */

mod adadelta;
mod adam;
mod base;
mod gain;
mod sgd;

pub use adadelta::{AdadeltaParams, AdadeltaSolver};
pub use adam::{AdamParams, AdamSolver};
pub use base::{Solver, SolverDescriptor, SolverKind};
pub use gain::{GainParams, GainSolver};
pub use sgd::{SgdParams, SgdSolver};
