use thiserror::Error;
mod ops;
pub use self::ops::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    // 张量二元运算
    #[error(
        "形状不一致，故无法{operator}：第一个张量的形状为{tensor1_shape:?}，第二个张量的形状为{tensor2_shape:?}"
    )]
    OperatorError {
        operator: Operator,
        tensor1_shape: Vec<usize>,
        tensor2_shape: Vec<usize>,
    },
    #[error("数据长度{data_len}与形状{shape:?}的元素个数不一致")]
    DataLenMismatch { data_len: usize, shape: Vec<usize> },
    #[error("不支持的张量维数{0}：张量只支持1~4维")]
    UnsupportedRank(usize),
    #[error("矩阵乘法要求前者的列数等于后者的行数：{0:?} x {1:?}")]
    MatMulMismatch(Vec<usize>, Vec<usize>),
}
