/*
 * @Author       : 老董
 * @Date         : 2026-02-15
 * @Description  : 提升（Lifting）节点：在空间与通道之间重排像素，不改变元素个数
 *
 * - `Down`：[N, C, H, W] -> [N, 4C, H/2, W/2]，每个2x2块的四个像素依次放入相邻的4个通道（H、W须为偶数）
 * - `Up`：  [N, C, H, W] -> [N, C/4, 2H, 2W]，`Down`的逆（C须为4的倍数）
 */

use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use ndarray::Array4;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiftingMode {
    Down,
    Up,
}

#[derive(Debug, Clone)]
pub struct Lifting {
    mode: LiftingMode,
}

impl Lifting {
    pub(crate) const fn new(mode: LiftingMode) -> Self {
        Self { mode }
    }

    pub const fn mode(&self) -> LiftingMode {
        self.mode
    }

    /// 输出下标对应的输入下标
    fn source(&self, (n, c, h, w): (usize, usize, usize, usize)) -> [usize; 4] {
        match self.mode {
            LiftingMode::Down => {
                let block = c % 4;
                [n, c / 4, 2 * h + block / 2, 2 * w + block % 2]
            }
            LiftingMode::Up => [n, 4 * c + 2 * (h % 2) + w % 2, h / 2, w / 2],
        }
    }
}

impl TraitNode for Lifting {
    fn kind(&self) -> &'static str {
        "Lifting"
    }

    fn min_num_inputs(&self) -> usize {
        1
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        let [n, c, h, w] = input_shapes[0];
        match self.mode {
            LiftingMode::Down if h % 2 == 0 && w % 2 == 0 => Ok(vec![[n, 4 * c, h / 2, w / 2]]),
            LiftingMode::Up if c % 4 == 0 => Ok(vec![[n, c / 4, 2 * h, 2 * w]]),
            mode => Err(GraphError::InvalidOperation(format!(
                "Lifting({mode:?})无法作用于形状{:?}：Down要求H、W为偶数，Up要求C为4的倍数",
                input_shapes[0]
            ))),
        }
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let x = inputs[0].view();
        let y = Array4::from_shape_fn(outputs[0].dims(), |idx| x[self.source(idx)]);
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
        // 一一对应的重排，梯度按同一映射搬回
        let dy = output_diff(outputs, 0, self.kind())?.view();
        let mut dx = Array4::<f32>::zeros(inputs[0].dims());
        for (idx, &g) in dy.indexed_iter() {
            dx[self.source(idx)] = g;
        }
        Ok(vec![Some(Tensor::from_array(dx))])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Lifting { mode: self.mode }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        format!(
            "lifting({}, LiftingMode::{:?}, Some({name:?}))",
            inputs[0], self.mode
        )
    }
}
