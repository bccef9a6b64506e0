use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use ndarray::{Array4, Axis};
use rand::rngs::StdRng;

/// 按通道加偏置：输入`[N,C,H,W]`，偏置`[1,C,1,1]`
#[derive(Debug, Clone, Default)]
pub struct BiasAdd;

impl BiasAdd {
    pub(crate) const fn new() -> Self {
        Self
    }
}

impl TraitNode for BiasAdd {
    fn kind(&self) -> &'static str {
        "BiasAdd"
    }

    fn min_num_inputs(&self) -> usize {
        2
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        let [_, c, _, _] = input_shapes[0];
        let expected = [1, c, 1, 1];
        if input_shapes[1] != expected {
            return Err(GraphError::ShapeMismatch {
                expected: expected.to_vec(),
                got: input_shapes[1].to_vec(),
                message: "BiasAdd节点的偏置形状必须为[1, C, 1, 1]".to_string(),
            });
        }
        Ok(vec![input_shapes[0]])
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let (a, bias) = (inputs[0].view(), inputs[1].view());
        let data = Array4::from_shape_fn(a.dim(), |(n, c, h, w)| a[[n, c, h, w]] + bias[[0, c, 0, 0]]);
        write_output(outputs, 0, &Tensor::from_array(data))
    }

    fn backward(
        &mut self,
        _inputs: &[&Tensor],
        outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        let diff = output_diff(outputs, 0, self.kind())?;
        let bias_grad = needs[1].then(|| {
            // 对N、H、W求和，保留通道维
            let summed = diff
                .view()
                .sum_axis(Axis(3))
                .sum_axis(Axis(2))
                .sum_axis(Axis(0));
            let c = summed.len();
            Tensor::from_array(Array4::from_shape_fn([1, c, 1, 1], |(_, ci, _, _)| summed[ci]))
        });
        Ok(vec![needs[0].then(|| diff.clone()), bias_grad])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::BiasAdd
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!("bias_add({}, {}, Some({name:?}))", inputs[0], inputs[1])
    }
}
