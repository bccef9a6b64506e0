/*
 * @Author       : 老董
 * @Date         : 2026-02-04
 * @Description  : 激活函数节点。各模式的前向/导数都是不带状态的纯函数，集中在`ActivationMode`上。
 */

use crate::nn::descriptor::NodeTypeDescriptor;
use crate::nn::nodes::raw_node::{output_diff, write_output, TraitNode};
use crate::nn::terminal::NodeOutput;
use crate::nn::{GraphError, PassContext};
use crate::tensor::{Shape4, Tensor};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum ActivationMode {
    Sigmoid,
    Relu,
    Tanh,
    /// `min(max(x, 0), ceiling)`
    ClippedRelu { ceiling: f32 },
    /// `x`（x>0）或`alpha*(e^x - 1)`
    Elu { alpha: f32 },
    /// `x`（x>0）或`slope*x`
    LeakyRelu { slope: f32 },
}

impl ActivationMode {
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Sigmoid => 1. / (1. + (-x).exp()),
            Self::Relu => x.max(0.),
            Self::Tanh => x.tanh(),
            Self::ClippedRelu { ceiling } => x.max(0.).min(ceiling),
            Self::Elu { alpha } => {
                if x > 0. {
                    x
                } else {
                    alpha * (x.exp() - 1.)
                }
            }
            Self::LeakyRelu { slope } => {
                if x > 0. {
                    x
                } else {
                    slope * x
                }
            }
        }
    }

    /// 由输入`x`与输出`y`求导数
    pub fn derivative(self, x: f32, y: f32) -> f32 {
        match self {
            Self::Sigmoid => y * (1. - y),
            Self::Relu => (x > 0.) as u8 as f32,
            Self::Tanh => 1. - y * y,
            Self::ClippedRelu { ceiling } => (x > 0. && x < ceiling) as u8 as f32,
            Self::Elu { alpha } => {
                if x > 0. {
                    1.
                } else {
                    y + alpha
                }
            }
            Self::LeakyRelu { slope } => {
                if x > 0. {
                    1.
                } else {
                    slope
                }
            }
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Sigmoid => "Sigmoid",
            Self::Relu => "Relu",
            Self::Tanh => "Tanh",
            Self::ClippedRelu { .. } => "ClippedRelu",
            Self::Elu { .. } => "Elu",
            Self::LeakyRelu { .. } => "LeakyRelu",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Activation {
    mode: ActivationMode,
}

impl Activation {
    pub(crate) const fn new(mode: ActivationMode) -> Self {
        Self { mode }
    }

    pub const fn mode(&self) -> ActivationMode {
        self.mode
    }
}

impl TraitNode for Activation {
    fn kind(&self) -> &'static str {
        self.mode.name()
    }

    fn min_num_inputs(&self) -> usize {
        1
    }

    fn init(&mut self, input_shapes: &[Shape4], _rng: &mut StdRng) -> Result<Vec<Shape4>, GraphError> {
        match self.mode {
            ActivationMode::ClippedRelu { ceiling } if ceiling <= 0. => {
                Err(GraphError::InvalidOperation(format!(
                    "ClippedRelu的上限必须为正数，得到{ceiling}"
                )))
            }
            _ => Ok(vec![input_shapes[0]]),
        }
    }

    fn forward(
        &mut self,
        inputs: &[&Tensor],
        outputs: &mut [NodeOutput],
        _ctx: &PassContext,
    ) -> Result<(), GraphError> {
        let mode = self.mode;
        write_output(outputs, 0, &inputs[0].map(|x| mode.apply(x)))
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
        let mode = self.mode;
        let diff = output_diff(outputs, 0, self.kind())?;
        let local = inputs[0].zip_map(outputs[0].value(), |x, y| mode.derivative(x, y));
        Ok(vec![Some(&local * diff)])
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        NodeTypeDescriptor::Activation { mode: self.mode }
    }

    fn to_code(&self, inputs: &[String], name: &str) -> String {
        let x = &inputs[0];
        match self.mode {
            ActivationMode::Sigmoid => format!("sigmoid({x}, Some({name:?}))"),
            ActivationMode::Relu => format!("relu({x}, Some({name:?}))"),
            ActivationMode::Tanh => format!("tanh({x}, Some({name:?}))"),
            ActivationMode::ClippedRelu { ceiling } => {
                format!("clipped_relu({x}, {ceiling:?}, Some({name:?}))")
            }
            ActivationMode::Elu { alpha } => format!("elu({x}, {alpha:?}, Some({name:?}))"),
            ActivationMode::LeakyRelu { slope } => {
                format!("leaky_relu({x}, {slope:?}, Some({name:?}))")
            }
        }
    }
}
