use super::{run_backward, run_forward};
use crate::assert_err;
use crate::nn::nodes::raw_node::{Loss, SoftmaxLoss, SquareError};
use crate::nn::nodes::TraitNode;
use crate::nn::{BackwardType, ForwardType, GraphError, LossReduction, PassContext};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_square_error() {
    let a = Tensor::new(&[1., 3.], &[2]);
    let b = Tensor::new(&[2., 1.], &[2]);
    let ctx = PassContext::default();
    let mut node = SquareError::new();
    let mut outputs = run_forward(&mut node, &[&a, &b], &ctx);
    assert_eq!(outputs[0].value().to_vec(), vec![1., 4.]);

    let grads = run_backward(&mut node, &[&a, &b], &mut outputs, &Tensor::ones([1, 2, 1, 1]), &ctx);
    assert_eq!(grads[0].as_ref().unwrap().to_vec(), vec![-2., 4.]);
    assert_eq!(grads[1].as_ref().unwrap().to_vec(), vec![2., -4.]);
}

#[test]
fn test_loss_reduction_and_coefficient() {
    let err = Tensor::new(&[1., 2., 3., 4.], &[4]);
    let coef = Tensor::new(&[0.5], &[1, 1]);
    let ctx = PassContext::default();

    let mut avg = Loss::new(LossReduction::Avg, true);
    assert_eq!(avg.forward_type(), ForwardType::Always);
    assert_eq!(avg.backward_type(), BackwardType::Always);
    let mut outputs = run_forward(&mut avg, &[&err, &coef], &ctx);
    assert_abs_diff_eq!(outputs[0].value().number().unwrap(), 1.25);
    let grads = run_backward(&mut avg, &[&err, &coef], &mut outputs, &Tensor::zeros([1, 1, 1, 1]), &ctx);
    assert_abs_diff_eq!(grads[0].as_ref().unwrap(), &Tensor::full(0.125, [1, 4, 1, 1]));
    assert_abs_diff_eq!(grads[1].as_ref().unwrap().number().unwrap(), 2.5);

    let mut sum = Loss::new(LossReduction::Sum, false);
    assert_eq!(sum.min_num_inputs(), 1);
    let outputs = run_forward(&mut sum, &[&err], &ctx);
    assert_abs_diff_eq!(outputs[0].value().number().unwrap(), 10.);
}

#[test]
fn test_loss_coefficient_must_be_scalar() {
    let mut rng = StdRng::seed_from_u64(0);
    assert_err!(
        Loss::new(LossReduction::Avg, true).init(&[[1, 4, 1, 1], [1, 2, 1, 1]], &mut rng),
        GraphError::ShapeMismatch { .. }
    );
}

#[test]
fn test_softmax_loss_outputs_and_gradient() {
    let logits = Tensor::zeros([1, 2, 1, 1]);
    let target = Tensor::new(&[0., 1.], &[2]);
    let ctx = PassContext::default();
    let mut node = SoftmaxLoss::new();
    let mut outputs = run_forward(&mut node, &[&logits, &target], &ctx);
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].value().to_vec(), vec![0.5, 0.5]);
    assert_abs_diff_eq!(outputs[1].value().number().unwrap(), 2f32.ln(), epsilon = 1e-6);

    // 概率输出上没有下游梯度时，logits的梯度为 (p - t)/N
    let grads = run_backward(&mut node, &[&logits, &target], &mut outputs, &Tensor::zeros([1, 2, 1, 1]), &ctx);
    assert_abs_diff_eq!(grads[0].as_ref().unwrap(), &Tensor::new(&[0.5, -0.5], &[2]), epsilon = 1e-6);

    // 概率输出上的下游梯度经softmax的雅可比叠加进来
    let grads = run_backward(&mut node, &[&logits, &target], &mut outputs, &Tensor::new(&[1., 0.], &[2]), &ctx);
    assert_abs_diff_eq!(grads[0].as_ref().unwrap(), &Tensor::new(&[0.75, -0.75], &[2]), epsilon = 1e-6);
}

#[test]
fn test_softmax_loss_averages_over_batch() {
    // 两个样本，每个样本3类
    let logits = Tensor::new(&[0., 0., 0., 10., 0., 0.], &[2, 3]);
    let target = Tensor::new(&[1., 0., 0., 1., 0., 0.], &[2, 3]);
    let outputs = run_forward(&mut SoftmaxLoss::new(), &[&logits, &target], &PassContext::default());
    let probs = outputs[0].value().view();
    for n in 0..2 {
        let total = (0..3).map(|c| probs[[n, c, 0, 0]]).sum::<f32>();
        assert_abs_diff_eq!(total, 1., epsilon = 1e-6);
    }
    let expected = (3f32.ln() + -(probs[[1, 0, 0, 0]].ln())) / 2.;
    assert_abs_diff_eq!(outputs[1].value().number().unwrap(), expected, epsilon = 1e-5);
}
