/*
 * @Author       : 老董
 * @Date         : 2026-02-15
 * @Description  : 丢弃（Dropout）节点
 *
 * 训练相位（或没有相位）下每个元素以概率`ratio`置零，保留的元素乘以1/(1-ratio)，使期望不变；
 * 其余相位下原样输出。掩码在前向时生成并留给反向使用。
 */

use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use ndarray::Array4;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct Dropout {
    ratio: f32,
    rng: Option<StdRng>,
    /// 最近一次前向的掩码；None表示那次前向原样输出
    mask: Option<Array4<f32>>,
}

impl Dropout {
    pub(crate) const fn new(ratio: f32) -> Self {
        Self {
            ratio,
            rng: None,
            mask: None,
        }
    }

    pub const fn ratio(&self) -> f32 {
        self.ratio
    }
}

impl TraitNode for Dropout {
    fn kind(&self) -> &'static str {
        "Dropout"
    }

    fn min_num_inputs(&self) -> usize {
        1
    }

    fn init(&mut self, input_shapes: &[Shape4], rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        if !(0. ..1.).contains(&self.ratio) {
            return Err(GraphError::InvalidOperation(format!(
                "Dropout的丢弃比例必须在[0, 1)内，得到{}",
                self.ratio
            )));
        }
        self.rng = Some(StdRng::seed_from_u64(rng.gen()));
        self.mask = None;
        Ok(vec![input_shapes[0]])
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        ctx: &PassContext,
    ) -> Result<(), GraphError> {
        if !ctx.is_training() || self.ratio == 0. {
            self.mask = None;
            return write_output(outputs, 0, inputs[0]);
        }

        let rng = self.rng.as_mut().ok_or_else(|| {
            GraphError::ComputationError("Dropout节点尚未初始化随机源".to_string())
        })?;
        let (ratio, keep) = (self.ratio, 1. / (1. - self.ratio));
        let x = inputs[0].view();
        let mask = Array4::from_shape_fn(x.dim(), |_| {
            if rng.gen::<f32>() < ratio {
                0.
            } else {
                keep
            }
        });
        let y = &x * &mask;
        self.mask = Some(mask);
        write_output(outputs, 0, &Tensor::from_array(y))
    }

    fn backward(
        &mut self,
        _inputs: &[&Tensor],
        outputs: &[NodeOutput],
        needs: &[bool],
        _ctx: &PassContext,
    ) -> Result<Vec<Option<Tensor>>, GraphError> {
        if !needs[0] {
            return Ok(vec![None]);
        }
        let dy = output_diff(outputs, 0, self.kind())?;
        let dx = match &self.mask {
            Some(mask) => Tensor::from_array(&dy.view() * mask),
            None => dy.clone(),
        };
        Ok(vec![Some(dx)])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Dropout { ratio: self.ratio }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!("dropout({}, {:?}, Some({name:?}))", inputs[0], self.ratio)
    }
}
