/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 原始节点：每种运算一个结构体，统一实现`TraitNode`，并由`enum_dispatch`分派。
 *                 节点本身不保存输入/输出张量，张量归图中的输出端子所有；
 *                 图在调用`forward`/`backward`时把所需的张量借给节点。
 */

mod data_generator;
mod loss;
mod ops;
mod place_holder;
mod routing;
mod variable;

pub use data_generator::DataGenerator;
pub use loss::{Loss, LossReduction, SoftmaxLoss, SquareError};
pub use ops::{
    Activation, ActivationMode, Add, BatchNormMode, BatchNormParams, BatchNormalization, BiasAdd,
    Conv2d, Conv2dParams, Dropout, Elementwise, ElementwiseOp, Equal, Lifting, LiftingMode, MatMul,
    Pooling, PoolingParams, Reduce, ReduceOp, Restructure, Softmax, TransposedConv2d,
};
pub use place_holder::PlaceHolder;
pub use routing::{Multiplexer, Phaseplexer, RandomSelector, Switch};
pub use variable::Variable;

use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::initializer::Initializer;
use crate::nn::terminal::NodeOutput;
use crate::nn::{BackwardType, ForwardType, GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use enum_dispatch::enum_dispatch;
use rand::rngs::StdRng;

#[enum_dispatch]
#[derive(Debug, Clone)]
pub enum NodeType {
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓数据源↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    PlaceHolder(PlaceHolder),
    Variable(Variable),
    DataGenerator(DataGenerator),
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑数据源↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓算子↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    Add(Add),
    BiasAdd(BiasAdd),
    Elementwise(Elementwise),
    Activation(Activation),
    MatMul(MatMul),
    Conv2d(Conv2d),
    TransposedConv2d(TransposedConv2d),
    Pooling(Pooling),
    BatchNormalization(BatchNormalization),
    Dropout(Dropout),
    Softmax(Softmax),
    Restructure(Restructure),
    Lifting(Lifting),
    Reduce(Reduce),
    Equal(Equal),
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑算子↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓损失↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    SquareError(SquareError),
    Loss(Loss),
    SoftmaxLoss(SoftmaxLoss),
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑损失↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓路由↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    Multiplexer(Multiplexer),
    Switch(Switch),
    Phaseplexer(Phaseplexer),
    RandomSelector(RandomSelector),
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑路由↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
}

#[enum_dispatch(NodeType)]
pub trait TraitNode {
    /// 节点类别名（用于日志、自动命名、代码生成）
    fn kind(&self) -> &'static str;

    fn min_num_inputs(&self) -> usize;

    fn min_num_outputs(&self) -> usize {
        1
    }

    fn forward_type(&self) -> ForwardType {
        ForwardType::DependsOnOutputs
    }

    fn backward_type(&self) -> BackwardType {
        BackwardType::DependsOnInputs
    }

    /// 只有`Variable`可训练：其梯度跨多次反向累加，直到`reset_gradients`
    fn is_trainable(&self) -> bool {
        false
    }

    /// 由外部控制状态决定的闸门：为false时本节点本次前向不执行（如未选中任何输入的复用器）
    fn is_active(&self, _ctx: &PassContext) -> bool {
        true
    }

    /// 第`slot`个输入在本次传播中是否被读取（复用器只读选中的那个）
    fn input_active(&self, _slot: usize, _ctx: &PassContext) -> bool {
        true
    }

    /// 反向时第`slot`个输入是否接收梯度；按最近一次前向实际读取的输入判断
    fn backward_input_active(&self, slot: usize, ctx: &PassContext) -> bool {
        self.input_active(slot, ctx)
    }

    /// 校验输入形状并推断各输出的形状；初始化时调用且只调用一次
    fn init(&mut self, input_shapes: &[Shape4], rng: &mut StdRng)
        -> Result<Vec<Shape4>, GraphError>;

    /// 输出端子分配完成后写入初始内容（参数的初始值等）
    fn init_outputs(
        &mut self,
        _outputs: &mut [NodeOutput],
        _rng: &mut StdRng,
    ) -> Result<(), GraphError> {
        Ok(())
    }

    /// 读取输入的值，写入本节点输出端子的值
    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        ctx: &PassContext,
    ) -> Result<(), GraphError>;

    /// 读取本节点输出端子的梯度与输入的值，返回对每个输入的梯度贡献；
    /// `needs[i]`为false的输入可以直接返回None
    fn backward(
        &mut self,
        inputs: &[&Tensor],
        _outputs: &[NodeOutput],
        _needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        Ok(vec![None; inputs.len()])
    }

    fn descriptor(&self) -> NodeTypeDescriptor;

    /// 渲染为图定义接口的一次调用（不含`graph.`前缀），`inputs`为各输入对应的变量名
    fn to_code(&self, inputs: &[String], name: &str) -> String;
}

// ========== 供各节点共用的小工具 ==========

/// 取输出端子的梯度；按约定参与反向的节点一定分配了梯度
pub(super) fn output_diff<'a>(
    outputs: &'a [NodeOutput],
    index: usize,
    kind: &str,
) -> Result<&'a Tensor, GraphError> {
    outputs
        .get(index)
        .and_then(NodeOutput::diff)
        .ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{kind}节点的第{index}个输出没有梯度缓冲。不该触及本错误，否则说明crate代码有问题"
            ))
        })
}

/// 所有输入形状必须相同，返回该形状
pub(super) fn same_shapes(input_shapes: &[Shape4], kind: &str) -> Result<Shape4, GraphError> {
    let first = input_shapes[0];
    for shape in input_shapes.iter().skip(1) {
        if *shape != first {
            return Err(GraphError::ShapeMismatch {
                expected: first.to_vec(),
                got: shape.to_vec(),
                message: format!("{kind}节点的所有输入形状必须相同"),
            });
        }
    }
    Ok(first)
}

pub(super) fn write_output(
    outputs: &mut [NodeOutput],
    index: usize,
    value: &Tensor,
) -> Result<(), GraphError> {
    let output = outputs.get_mut(index).ok_or_else(|| {
        GraphError::ComputationError(format!("输出端子{index}不存在"))
    })?;
    output.value_mut().assign(value)?;
    Ok(())
}

impl NodeType {
    /// 按描述重建原始节点（模型加载时使用）；`num_inputs`为该节点描述中的输入个数
    pub(crate) fn from_descriptor(descriptor: &NodeTypeDescriptor, num_inputs: usize) -> Self {
        match descriptor {
            NodeTypeDescriptor::PlaceHolder { dims } => PlaceHolder::new(*dims).into(),
            NodeTypeDescriptor::Variable { init, dims, solver } => Variable::new(
                Initializer::new(dims, init.clone()),
                solver.as_deref(),
            )
            .into(),
            NodeTypeDescriptor::DataGenerator { init, dims } => {
                DataGenerator::new(Initializer::new(dims, init.clone())).into()
            }
            NodeTypeDescriptor::Add { alpha, beta } => Add::new(*alpha, *beta).into(),
            NodeTypeDescriptor::BiasAdd => BiasAdd::new().into(),
            NodeTypeDescriptor::Elementwise { op } => Elementwise::new(*op).into(),
            NodeTypeDescriptor::Activation { mode } => Activation::new(*mode).into(),
            NodeTypeDescriptor::MatMul => MatMul::new().into(),
            NodeTypeDescriptor::Conv2d { params } => Conv2d::new(*params).into(),
            NodeTypeDescriptor::TransposedConv2d { params } => TransposedConv2d::new(*params).into(),
            NodeTypeDescriptor::Pooling { params } => Pooling::new(*params).into(),
            NodeTypeDescriptor::BatchNormalization { params } => {
                BatchNormalization::new(*params).into()
            }
            NodeTypeDescriptor::Dropout { ratio } => Dropout::new(*ratio).into(),
            NodeTypeDescriptor::Softmax => Softmax::new().into(),
            NodeTypeDescriptor::Restructure { first, second } => {
                Restructure::new(*first, *second).into()
            }
            NodeTypeDescriptor::Lifting { mode } => Lifting::new(*mode).into(),
            NodeTypeDescriptor::Reduce { op, dim } => Reduce::new(*op, *dim).into(),
            NodeTypeDescriptor::Equal => Equal::new().into(),
            NodeTypeDescriptor::SquareError => SquareError::new().into(),
            NodeTypeDescriptor::Loss { reduction, coef } => Loss::new(*reduction, *coef).into(),
            NodeTypeDescriptor::SoftmaxLoss => SoftmaxLoss::new().into(),
            NodeTypeDescriptor::Multiplexer { selected } => {
                Multiplexer::new(num_inputs, *selected).into()
            }
            NodeTypeDescriptor::Switch { enabled } => Switch::new(*enabled).into(),
            NodeTypeDescriptor::Phaseplexer { phases } => Phaseplexer::new(phases.clone()).into(),
            NodeTypeDescriptor::RandomSelector { probability } => {
                RandomSelector::new(*probability).into()
            }
        }
    }
}
