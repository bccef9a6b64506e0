/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : 交换张量的两个维度（如把卷积核[K, C, kH, kW]的前两维对调，或转置图像的H、W）
 */

use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use ndarray::Array4;
use rand::rngs::StdRng;

#[derive(Debug, Clone)]
pub struct Restructure {
    first: usize,
    second: usize,
}

impl Restructure {
    pub(crate) const fn new(first: usize, second: usize) -> Self {
        Self { first, second }
    }

    pub const fn dims(&self) -> (usize, usize) {
        (self.first, self.second)
    }

    /// 交换两维后的下标；交换是自身的逆
    fn swapped(&self, (a, b, c, d): (usize, usize, usize, usize)) -> [usize; 4] {
        let mut index = [a, b, c, d];
        index.swap(self.first, self.second);
        index
    }
}

impl TraitNode for Restructure {
    fn kind(&self) -> &'static str {
        "Restructure"
    }

    fn min_num_inputs(&self) -> usize {
        1
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        if self.first >= 4 || self.second >= 4 {
            return Err(GraphError::InvalidOperation(format!(
                "Restructure只能交换0到3维，得到({}, {})",
                self.first, self.second
            )));
        }
        let mut dims = input_shapes[0];
        dims.swap(self.first, self.second);
        Ok(vec![dims])
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let x = inputs[0].view();
        let y = Array4::from_shape_fn(outputs[0].dims(), |idx| x[self.swapped(idx)]);
        write_output(outputs, 0, &Tensor::from_array(y))
    }

    fn backward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        if !needs[0] {
            return Ok(vec![None]);
        }
        let dy = output_diff(outputs, 0, self.kind())?.view();
        let dx = Array4::from_shape_fn(inputs[0].dims(), |idx| dy[self.swapped(idx)]);
        Ok(vec![Some(Tensor::from_array(dx))])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Restructure {
            first: self.first,
            second: self.second,
        }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!(
            "restructure({}, {}, {}, Some({name:?}))",
            inputs[0], self.first, self.second
        )
    }
}
