use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use rand::rngs::StdRng;

/// 矩阵乘法。两个输入都按`行 = N，列 = C*H*W`视为矩阵，输出形状`[行A, 列B, 1, 1]`。
#[derive(Debug, Clone, Default)]
pub struct MatMul {
    a_dims: Shape4,
    b_dims: Shape4,
}

impl MatMul {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn as_matrix_dims(dims: Shape4) -> (usize, usize) {
        (dims[0], dims[1] * dims[2] * dims[3])
    }
}

impl TraitNode for MatMul {
    fn kind(&self) -> &'static str {
        "MatMul"
    }

    fn min_num_inputs(&self) -> usize {
        2
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        let (row_a, col_a) = Self::as_matrix_dims(input_shapes[0]);
        let (row_b, col_b) = Self::as_matrix_dims(input_shapes[1]);
        if col_a != row_b {
            return Err(GraphError::ShapeMismatch {
                expected: vec![col_a],
                got: vec![row_b],
                message: format!(
                    "MatMul节点要求前者的列数等于后者的行数：{:?} x {:?}",
                    input_shapes[0], input_shapes[1]
                ),
            });
        }
        self.a_dims = input_shapes[0];
        self.b_dims = input_shapes[1];
        Ok(vec![[row_a, col_b, 1, 1]])
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let result = inputs[0].mat_mul(inputs[1])?;
        write_output(outputs, 0, &result)
    }

    fn backward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        let diff = output_diff(outputs, 0, self.kind())?;
        // dA = dY · Bᵀ，dB = Aᵀ · dY；再还原为各自输入的4维形状
        let grad_a = if needs[0] {
            Some(diff.mat_mul(&inputs[1].transpose())?.reshape(&self.a_dims)?)
        } else {
            None
        };
        let grad_b = if needs[1] {
            Some(inputs[0].transpose().mat_mul(diff)?.reshape(&self.b_dims)?)
        } else {
            None
        };
        Ok(vec![grad_a, grad_b])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::MatMul
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!("matmul({}, {}, Some({name:?}))", inputs[0], inputs[1])
    }
}
