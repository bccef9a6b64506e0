/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : Graph 图定义接口：每个方法登记一个节点，返回其输出句柄，
 *                 可直接作为后续构建调用的输入。`name`为None时自动生成"类别_序号"形式的名称。
 */

use super::super::error::GraphError;
use super::Graph;
use crate::nn::initializer::Initializer;
use crate::nn::nodes::raw_node::{
    Activation, ActivationMode, Add, BatchNormParams, BatchNormalization, BiasAdd, Conv2d,
    Conv2dParams, DataGenerator, Dropout, Elementwise, ElementwiseOp, Equal, Lifting, LiftingMode,
    Loss, LossReduction, MatMul, Multiplexer, Phaseplexer, PlaceHolder, Pooling, PoolingParams,
    RandomSelector, Reduce, ReduceOp, Restructure, Softmax, SoftmaxLoss, SquareError, Switch,
    TransposedConv2d, Variable,
};
use crate::nn::nodes::{MultiplexerHandle, PlaceholderHandle, SwitchHandle};
use crate::nn::OutputRef;
use crate::tensor::normalize_dims;

impl Graph {
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓数据源↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/

    /// 占位节点：其值由驱动循环写入（`Session::write_values`）
    pub fn place_holder(
        &mut self,
        dims: &[usize],
        name: Option<&str>,
    ) -> Result<PlaceholderHandle, GraphError> {
        let dims = normalize_dims(dims)?;
        let id = self.add_node(PlaceHolder::new(dims), &[], name)?;
        Ok(PlaceholderHandle::new(id))
    }

    /// 可训练参数；`solver`为其绑定的求解器名（None表示不被更新）
    pub fn variable(
        &mut self,
        initializer: Initializer,
        solver: Option<&str>,
        name: Option<&str>,
    ) -> Result<OutputRef, GraphError> {
        let id = self.add_node(Variable::new(initializer, solver), &[], name)?;
        Ok(OutputRef::new(id, 0))
    }

    /// 每次前向都按初始化器重新生成输出的数据源
    pub fn data_generator(
        &mut self,
        initializer: Initializer,
        name: Option<&str>,
    ) -> Result<OutputRef, GraphError> {
        self.single_output(DataGenerator::new(initializer), &[], name)
    }

    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑数据源↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓算子↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/

    pub fn add(&mut self, a: OutputRef, b: OutputRef, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.add_weighted(a, 1., b, 1., name)
    }

    pub fn subtract(&mut self, a: OutputRef, b: OutputRef, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.add_weighted(a, 1., b, -1., name)
    }

    /// `alpha*a + beta*b`
    pub fn add_weighted(
        &mut self,
        a: OutputRef,
        alpha: f32,
        b: OutputRef,
        beta: f32,
        name: Option<&str>,
    ) -> Result<OutputRef, GraphError> {
        self.single_output(Add::new(alpha, beta), &[a, b], name)
    }

    /// 按通道加偏置，`bias`形状须为`[1, C, 1, 1]`
    pub fn bias_add(&mut self, a: OutputRef, bias: OutputRef, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.single_output(BiasAdd::new(), &[a, bias], name)
    }

    pub fn square(&mut self, x: OutputRef, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.single_output(Elementwise::new(ElementwiseOp::Square), &[x], name)
    }

    pub fn abs(&mut self, x: OutputRef, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.single_output(Elementwise::new(ElementwiseOp::Abs), &[x], name)
    }

    pub fn log(&mut self, x: OutputRef, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.single_output(Elementwise::new(ElementwiseOp::Log), &[x], name)
    }

    pub fn sigmoid(&mut self, x: OutputRef, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.activation(x, ActivationMode::Sigmoid, name)
    }

    pub fn relu(&mut self, x: OutputRef, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.activation(x, ActivationMode::Relu, name)
    }

    pub fn tanh(&mut self, x: OutputRef, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.activation(x, ActivationMode::Tanh, name)
    }

    pub fn clipped_relu(&mut self, x: OutputRef, ceiling: f32, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.activation(x, ActivationMode::ClippedRelu { ceiling }, name)
    }

    pub fn elu(&mut self, x: OutputRef, alpha: f32, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.activation(x, ActivationMode::Elu { alpha }, name)
    }

    pub fn leaky_relu(&mut self, x: OutputRef, slope: f32, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.activation(x, ActivationMode::LeakyRelu { slope }, name)
    }

    pub fn activation(
        &mut self,
        x: OutputRef,
        mode: ActivationMode,
        name: Option<&str>,
    ) -> Result<OutputRef, GraphError> {
        self.single_output(Activation::new(mode), &[x], name)
    }

    /// `[rA, cA] x [rB, cB]`，张量按`rows = N, cols = C*H*W`视为矩阵
    pub fn matmul(&mut self, a: OutputRef, b: OutputRef, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.single_output(MatMul::new(), &[a, b], name)
    }

    pub fn conv2d(
        &mut self,
        input: OutputRef,
        filter: OutputRef,
        params: Conv2dParams,
        name: Option<&str>,
    ) -> Result<OutputRef, GraphError> {
        self.single_output(Conv2d::new(params), &[input, filter], name)
    }

    /// 最大池化
    pub fn pooling(
        &mut self,
        input: OutputRef,
        params: PoolingParams,
        name: Option<&str>,
    ) -> Result<OutputRef, GraphError> {
        self.single_output(Pooling::new(params), &[input], name)
    }

    /// 转置卷积，`filter`形状为[输入通道, 输出通道, kH, kW]
    pub fn transposed_conv2d(
        &mut self,
        input: OutputRef,
        filter: OutputRef,
        params: Conv2dParams,
        name: Option<&str>,
    ) -> Result<OutputRef, GraphError> {
        self.single_output(TransposedConv2d::new(params), &[input, filter], name)
    }

    /// 批归一化；`scale`、`bias`的形状由`params.mode`决定
    pub fn batch_normalization(
        &mut self,
        input: OutputRef,
        scale: OutputRef,
        bias: OutputRef,
        params: BatchNormParams,
        name: Option<&str>,
    ) -> Result<OutputRef, GraphError> {
        self.single_output(BatchNormalization::new(params), &[input, scale, bias], name)
    }

    /// 训练时以概率`ratio`丢弃元素
    pub fn dropout(&mut self, x: OutputRef, ratio: f32, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.single_output(Dropout::new(ratio), &[x], name)
    }

    /// 通道维上的softmax
    pub fn softmax(&mut self, x: OutputRef, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.single_output(Softmax::new(), &[x], name)
    }

    /// 交换第`first`与第`second`维
    pub fn restructure(
        &mut self,
        x: OutputRef,
        first: usize,
        second: usize,
        name: Option<&str>,
    ) -> Result<OutputRef, GraphError> {
        self.single_output(Restructure::new(first, second), &[x], name)
    }

    pub fn lifting(&mut self, x: OutputRef, mode: LiftingMode, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.single_output(Lifting::new(mode), &[x], name)
    }

    pub fn reduce_sum(&mut self, x: OutputRef, dim: usize, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.single_output(Reduce::new(ReduceOp::Sum, dim), &[x], name)
    }

    pub fn reduce_mean(&mut self, x: OutputRef, dim: usize, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.single_output(Reduce::new(ReduceOp::Mean, dim), &[x], name)
    }

    pub fn reduce_max(&mut self, x: OutputRef, dim: usize, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.single_output(Reduce::new(ReduceOp::Max, dim), &[x], name)
    }

    pub fn argmax(&mut self, x: OutputRef, dim: usize, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.single_output(Reduce::new(ReduceOp::Argmax, dim), &[x], name)
    }

    pub fn equal(&mut self, a: OutputRef, b: OutputRef, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.single_output(Equal::new(), &[a, b], name)
    }

    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑算子↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓损失↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/

    pub fn square_error(&mut self, a: OutputRef, b: OutputRef, name: Option<&str>) -> Result<OutputRef, GraphError> {
        self.single_output(SquareError::new(), &[a, b], name)
    }

    /// 标量损失`coef * reduce(err)`；`coef`为可选的标量输入（通常是占位节点）
    pub fn loss(
        &mut self,
        err: OutputRef,
        coef: Option<OutputRef>,
        reduction: LossReduction,
        name: Option<&str>,
    ) -> Result<OutputRef, GraphError> {
        match coef {
            Some(coef) => self.single_output(Loss::new(reduction, true), &[err, coef], name),
            None => self.single_output(Loss::new(reduction, false), &[err], name),
        }
    }

    /// 返回 (softmax概率, 交叉熵损失)
    pub fn softmax_loss(
        &mut self,
        logits: OutputRef,
        target: OutputRef,
        name: Option<&str>,
    ) -> Result<(OutputRef, OutputRef), GraphError> {
        let id = self.add_node(SoftmaxLoss::new(), &[logits, target], name)?;
        Ok((OutputRef::new(id, 0), OutputRef::new(id, 1)))
    }

    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑损失↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓路由↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/

    /// 复用器，初始时未选中任何输入
    pub fn multiplexer(
        &mut self,
        inputs: &[OutputRef],
        name: Option<&str>,
    ) -> Result<MultiplexerHandle, GraphError> {
        let id = self.add_node(Multiplexer::new(inputs.len(), None), inputs, name)?;
        Ok(MultiplexerHandle::new(id))
    }

    /// 开关，初始为打开
    pub fn switch(&mut self, input: OutputRef, name: Option<&str>) -> Result<SwitchHandle, GraphError> {
        let id = self.add_node(Switch::new(true), &[input], name)?;
        Ok(SwitchHandle::new(id))
    }

    /// 相位复用器：每路输入对应一个相位
    pub fn phaseplexer(
        &mut self,
        inputs: &[(OutputRef, &str)],
        name: Option<&str>,
    ) -> Result<OutputRef, GraphError> {
        for (_, phase) in inputs {
            self.check_phase(phase)?;
        }
        let phases = inputs.iter().map(|(_, p)| p.to_string()).collect();
        let refs = inputs.iter().map(|(r, _)| *r).collect::<Vec<_>>();
        self.single_output(Phaseplexer::new(phases), &refs, name)
    }

    /// 随机选择器：每次前向以概率`probability`转发`a`，否则转发`b`
    pub fn random_selector(
        &mut self,
        a: OutputRef,
        b: OutputRef,
        probability: f32,
        name: Option<&str>,
    ) -> Result<OutputRef, GraphError> {
        self.single_output(RandomSelector::new(probability), &[a, b], name)
    }

    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑路由↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /// 登记只有一个输出的节点并返回其输出句柄
    fn single_output<T: Into<crate::nn::nodes::NodeType>>(
        &mut self,
        raw_node: T,
        inputs: &[OutputRef],
        name: Option<&str>,
    ) -> Result<OutputRef, GraphError> {
        let id = self.add_node(raw_node, inputs, name)?;
        Ok(OutputRef::new(id, 0))
    }
}
