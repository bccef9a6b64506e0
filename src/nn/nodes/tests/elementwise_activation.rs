use super::{run_backward, run_forward};
use crate::assert_err;
use crate::nn::nodes::raw_node::{Activation, Add, BiasAdd, Elementwise, MatMul};
use crate::nn::nodes::TraitNode;
use crate::nn::{ActivationMode, ElementwiseOp, GraphError, PassContext};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_weighted_add_and_subtract() {
    let a = Tensor::new(&[1., 2.], &[2]);
    let b = Tensor::new(&[10., 20.], &[2]);
    let ctx = PassContext::default();

    let mut sub = Add::new(1., -1.);
    let mut outputs = run_forward(&mut sub, &[&a, &b], &ctx);
    assert_eq!(outputs[0].value().to_vec(), vec![-9., -18.]);

    let dy = Tensor::new(&[1., 1.], &[2]);
    let grads = run_backward(&mut sub, &[&a, &b], &mut outputs, &dy, &ctx);
    assert_eq!(grads[0].as_ref().unwrap().to_vec(), vec![1., 1.]);
    assert_eq!(grads[1].as_ref().unwrap().to_vec(), vec![-1., -1.]);
}

#[test]
fn test_bias_add_broadcasts_over_channels() {
    let x = Tensor::zeros([2, 3, 2, 2]);
    let bias = Tensor::new(&[1., 2., 3.], &[3]);
    let ctx = PassContext::default();
    let mut node = BiasAdd::new();
    let mut outputs = run_forward(&mut node, &[&x, &bias], &ctx);
    assert_eq!(outputs[0].value().view()[[1, 2, 1, 0]], 3.);

    let grads = run_backward(&mut node, &[&x, &bias], &mut outputs, &Tensor::ones([2, 3, 2, 2]), &ctx);
    // 每个通道累加 N*H*W = 8 个元素
    assert_eq!(grads[1].as_ref().unwrap().to_vec(), vec![8., 8., 8.]);

    let mut rng = StdRng::seed_from_u64(0);
    assert_err!(
        BiasAdd::new().init(&[[2, 3, 2, 2], [1, 2, 1, 1]], &mut rng),
        GraphError::ShapeMismatch { .. }
    );
}

#[test]
fn test_mat_mul_forward_backward() {
    let a = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[2, 3]);
    let b = Tensor::new(&[1., 0., 0., 1., 1., 1.], &[3, 2]);
    let ctx = PassContext::default();
    let mut node = MatMul::new();
    let mut outputs = run_forward(&mut node, &[&a, &b], &ctx);
    assert_eq!(outputs[0].dims(), [2, 2, 1, 1]);
    assert_eq!(outputs[0].value().to_vec(), vec![4., 5., 10., 11.]);

    let grads = run_backward(&mut node, &[&a, &b], &mut outputs, &Tensor::ones([2, 2, 1, 1]), &ctx);
    // dA = dY·Bᵀ：每行都是B各行之和
    assert_eq!(grads[0].as_ref().unwrap().to_vec(), vec![1., 1., 2., 1., 1., 2.]);
    // dB = Aᵀ·dY：每行都是A对应列之和
    assert_eq!(grads[1].as_ref().unwrap().to_vec(), vec![5., 5., 7., 7., 9., 9.]);

    let mut rng = StdRng::seed_from_u64(0);
    assert_err!(
        MatMul::new().init(&[[2, 3, 1, 1], [2, 3, 1, 1]], &mut rng),
        GraphError::ShapeMismatch { .. }
    );
}

#[test]
fn test_elementwise_ops() {
    let x = Tensor::new(&[-2., 0.5, 3.], &[3]);
    let dy = Tensor::ones([1, 3, 1, 1]);
    let ctx = PassContext::default();

    let mut square = Elementwise::new(ElementwiseOp::Square);
    let mut outputs = run_forward(&mut square, &[&x], &ctx);
    assert_eq!(outputs[0].value().to_vec(), vec![4., 0.25, 9.]);
    let grads = run_backward(&mut square, &[&x], &mut outputs, &dy, &ctx);
    assert_eq!(grads[0].as_ref().unwrap().to_vec(), vec![-4., 1., 6.]);

    let mut abs = Elementwise::new(ElementwiseOp::Abs);
    let mut outputs = run_forward(&mut abs, &[&x], &ctx);
    assert_eq!(outputs[0].value().to_vec(), vec![2., 0.5, 3.]);
    let grads = run_backward(&mut abs, &[&x], &mut outputs, &dy, &ctx);
    assert_eq!(grads[0].as_ref().unwrap().to_vec(), vec![-1., 1., 1.]);

    let positive = Tensor::new(&[1., 2., 4.], &[3]);
    let mut log = Elementwise::new(ElementwiseOp::Log);
    let mut outputs = run_forward(&mut log, &[&positive], &ctx);
    assert_abs_diff_eq!(outputs[0].value().view()[[0, 2, 0, 0]], 4f32.ln());
    let grads = run_backward(&mut log, &[&positive], &mut outputs, &dy, &ctx);
    assert_eq!(grads[0].as_ref().unwrap().to_vec(), vec![1., 0.5, 0.25]);
}

#[test]
fn test_activation_modes() {
    let cases = [
        (ActivationMode::Relu, -1., 0., 0.),
        (ActivationMode::Relu, 2., 2., 1.),
        (ActivationMode::Sigmoid, 0., 0.5, 0.25),
        (ActivationMode::Tanh, 0., 0., 1.),
        (ActivationMode::ClippedRelu { ceiling: 1. }, 3., 1., 0.),
        (ActivationMode::ClippedRelu { ceiling: 1. }, 0.5, 0.5, 1.),
        (ActivationMode::LeakyRelu { slope: 0.1 }, -2., -0.2, 0.1),
        (ActivationMode::Elu { alpha: 1. }, 0., 0., 1.),
    ];
    let ctx = PassContext::default();
    for (mode, x, y, dydx) in cases {
        let input = Tensor::new(&[x], &[1]);
        let mut node = Activation::new(mode);
        let mut outputs = run_forward(&mut node, &[&input], &ctx);
        assert_abs_diff_eq!(outputs[0].value().number().unwrap(), y, epsilon = 1e-6);
        let grads = run_backward(&mut node, &[&input], &mut outputs, &Tensor::new(&[2.], &[1]), &ctx);
        assert_abs_diff_eq!(grads[0].as_ref().unwrap().number().unwrap(), 2. * dydx, epsilon = 1e-6);
    }
}
