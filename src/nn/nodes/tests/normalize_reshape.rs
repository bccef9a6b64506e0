use super::{run_backward, run_forward};
use crate::assert_err;
use crate::nn::nodes::raw_node::{BatchNormalization, Dropout, Lifting, Restructure, Softmax};
use crate::nn::nodes::TraitNode;
use crate::nn::{BatchNormMode, BatchNormParams, GraphError, LiftingMode, PassContext, PhaseBehaviour};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn inference_ctx() -> PassContext<'static> {
    PassContext {
        phase: Some("test"),
        behaviour: Some(PhaseBehaviour::Inference),
    }
}

// ==================== BatchNormalization ====================

#[test]
fn test_batch_norm_spatial_normalizes_each_channel() {
    // 通道0取值0..8，通道1取值恒为3
    let mut data = (0..8).map(|i| i as f32).collect::<Vec<_>>();
    data.extend([3.; 8]);
    let x = Tensor::new(&data, &[1, 2, 2, 4]);
    let scale = Tensor::new(&[2., 1.], &[1, 2, 1, 1]);
    let bias = Tensor::new(&[1., -1.], &[1, 2, 1, 1]);
    let mut bn = BatchNormalization::new(BatchNormParams::new(BatchNormMode::Spatial));
    let outputs = run_forward(&mut bn, &[&x, &scale, &bias], &PassContext::default());

    let y = outputs[0].value().view();
    let channel0 = y.index_axis(ndarray::Axis(1), 0).iter().copied().collect::<Vec<f32>>();
    let mean0 = channel0.iter().sum::<f32>() / 8.;
    let var0 = channel0.iter().map(|v| (v - mean0).powi(2)).sum::<f32>() / 8.;
    // scale=2、bias=1：均值1，方差约4
    assert_abs_diff_eq!(mean0, 1., epsilon = 1e-5);
    assert_abs_diff_eq!(var0, 4., epsilon = 1e-3);
    // 常数通道归一化后为0，只剩偏置
    assert!(y.index_axis(ndarray::Axis(1), 1).iter().all(|&v| (v + 1.).abs() < 1e-5));

    // 滑动统计量：0.9 * 初值 + 0.1 * 本批（方差为无偏估计）
    assert_abs_diff_eq!(bn.running_mean().to_vec()[0], 0.35, epsilon = 1e-5);
    assert_abs_diff_eq!(bn.running_var().to_vec()[0], 0.9 + 0.1 * 6., epsilon = 1e-5);
    assert_abs_diff_eq!(bn.running_var().to_vec()[1], 0.9, epsilon = 1e-5);
}

#[test]
fn test_batch_norm_inference_uses_running_stats() {
    let x = Tensor::new(&[1., 3.], &[2, 1]);
    let scale = Tensor::ones([1, 1, 1, 1]);
    let bias = Tensor::zeros([1, 1, 1, 1]);
    let params = BatchNormParams {
        mode: BatchNormMode::PerActivation,
        epsilon: 1e-5,
        momentum: 1.,
    };
    let mut bn = BatchNormalization::new(params);
    let train = run_forward(&mut bn, &[&x, &scale, &bias], &PassContext::default());
    assert_abs_diff_eq!(train[0].value().to_vec()[0], -1., epsilon = 1e-4);
    // momentum=1：滑动统计量直接取本批（均值2，无偏方差2）
    assert_eq!(bn.running_mean().to_vec(), vec![2.]);
    assert_abs_diff_eq!(bn.running_var().to_vec()[0], 2., epsilon = 1e-6);

    let mut outputs = train;
    let unseen = Tensor::new(&[2., 4.], &[2, 1]);
    bn.forward(&[&unseen, &scale, &bias], &mut outputs, &inference_ctx())
        .unwrap();
    let expected = [0., 2. / (2f32 + 1e-5).sqrt()];
    assert_abs_diff_eq!(outputs[0].value().to_vec()[0], expected[0], epsilon = 1e-5);
    assert_abs_diff_eq!(outputs[0].value().to_vec()[1], expected[1], epsilon = 1e-5);
    // 推断时不更新统计量
    assert_eq!(bn.running_mean().to_vec(), vec![2.]);
}

/// 用中心差分校验对x、scale、bias的梯度；loss = Σ w·y
#[test]
fn test_batch_norm_gradients_match_finite_difference() {
    let mut rng = StdRng::seed_from_u64(17);
    let x = Tensor::normal_with_rng(0., 1., [3, 2, 2, 1], &mut rng);
    let scale = Tensor::normal_with_rng(1., 0.2, [1, 2, 1, 1], &mut rng);
    let bias = Tensor::normal_with_rng(0., 0.2, [1, 2, 1, 1], &mut rng);
    let w = Tensor::normal_with_rng(0., 1., [3, 2, 2, 1], &mut rng);
    let ctx = PassContext::default();
    let params = BatchNormParams::new(BatchNormMode::Spatial);

    let loss = |inputs: [&Tensor; 3]| -> f32 {
        let mut bn = BatchNormalization::new(params);
        let outputs = run_forward(&mut bn, &inputs, &ctx);
        (outputs[0].value() * &w).sum()
    };

    let mut bn = BatchNormalization::new(params);
    let inputs = [&x, &scale, &bias];
    let mut outputs = run_forward(&mut bn, &inputs, &ctx);
    let grads = run_backward(&mut bn, &inputs, &mut outputs, &w, &ctx);

    let h = 1e-2;
    for slot in 0..3 {
        let analytic = grads[slot].as_ref().unwrap().to_vec();
        let base = inputs[slot];
        for (i, &g) in analytic.iter().enumerate() {
            let mut plus = base.to_vec();
            let mut minus = base.to_vec();
            plus[i] += h;
            minus[i] -= h;
            let plus = Tensor::new(&plus, &base.dims());
            let minus = Tensor::new(&minus, &base.dims());
            let mut shifted_plus = inputs;
            let mut shifted_minus = inputs;
            shifted_plus[slot] = &plus;
            shifted_minus[slot] = &minus;
            let numeric = (loss(shifted_plus) - loss(shifted_minus)) / (2. * h);
            assert_abs_diff_eq!(g, numeric, epsilon = 2e-2);
        }
    }
}

#[test]
fn test_batch_norm_rejects_mismatched_parameters() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut spatial = BatchNormalization::new(BatchNormParams::new(BatchNormMode::Spatial));
    assert_err!(
        spatial.init(&[[4, 3, 5, 5], [1, 3, 5, 5], [1, 3, 1, 1]], &mut rng),
        GraphError::ShapeMismatch { .. }
    );
    let mut per_activation = BatchNormalization::new(BatchNormParams::new(BatchNormMode::PerActivation));
    assert_eq!(
        per_activation
            .init(&[[4, 3, 5, 5], [1, 3, 5, 5], [1, 3, 5, 5]], &mut rng)
            .unwrap(),
        vec![[4, 3, 5, 5]]
    );
    let bad_eps = BatchNormParams {
        epsilon: 0.,
        ..Default::default()
    };
    assert_err!(
        BatchNormalization::new(bad_eps).init(&[[1, 1, 1, 1]; 3], &mut rng),
        GraphError::InvalidOperation(_)
    );
}

// ==================== Dropout ====================

#[test]
fn test_dropout_masks_during_training_only() {
    let x = Tensor::ones([4, 25, 1, 1]);
    let mut dropout = Dropout::new(0.5);
    let mut outputs = run_forward(&mut dropout, &[&x], &PassContext::default());
    let y = outputs[0].value().to_vec();
    assert!(y.iter().all(|&v| v == 0. || v == 2.));
    let kept = y.iter().filter(|&&v| v > 0.).count();
    assert!(kept > 20 && kept < 80, "保留了{kept}个");

    // 梯度沿同一掩码回传
    let dy = Tensor::ones([4, 25, 1, 1]);
    let grads = run_backward(&mut dropout, &[&x], &mut outputs, &dy, &PassContext::default());
    assert_eq!(grads[0].as_ref().unwrap().to_vec(), y);

    // 推断相位原样输出
    dropout.forward(&[&x], &mut outputs, &inference_ctx()).unwrap();
    assert_eq!(outputs[0].value(), &x);
    let grads = run_backward(&mut dropout, &[&x], &mut outputs, &dy, &inference_ctx());
    assert_eq!(grads[0].as_ref().unwrap(), &dy);
}

#[test]
fn test_dropout_rejects_invalid_ratio() {
    let mut rng = StdRng::seed_from_u64(0);
    assert_err!(
        Dropout::new(1.).init(&[[1, 1, 1, 1]], &mut rng),
        GraphError::InvalidOperation(_)
    );
    assert_err!(
        Dropout::new(-0.1).init(&[[1, 1, 1, 1]], &mut rng),
        GraphError::InvalidOperation(_)
    );
}

// ==================== Softmax ====================

#[test]
fn test_softmax_over_channels() {
    let x = Tensor::new(&[0., 0., 1., 2.], &[2, 2]);
    let ctx = PassContext::default();
    let mut softmax = Softmax::new();
    let mut outputs = run_forward(&mut softmax, &[&x], &ctx);
    let p = outputs[0].value().to_vec();
    assert_abs_diff_eq!(p[0], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(p[2] + p[3], 1., epsilon = 1e-6);
    assert_abs_diff_eq!(p[3] / p[2], 1f32.exp(), epsilon = 1e-4);

    // 各通道梯度相同时，概率和恒为1，故梯度为0
    let grads = run_backward(&mut softmax, &[&x], &mut outputs, &Tensor::ones([2, 2, 1, 1]), &ctx);
    assert!(grads[0].as_ref().unwrap().to_vec().iter().all(|g| g.abs() < 1e-6));

    // 只对第0个通道求导：dz = p0 * (e0 - p)
    let dy = Tensor::new(&[1., 0., 1., 0.], &[2, 2]);
    let grads = run_backward(&mut softmax, &[&x], &mut outputs, &dy, &ctx);
    let g = grads[0].as_ref().unwrap().to_vec();
    assert_abs_diff_eq!(g[0], 0.25, epsilon = 1e-6);
    assert_abs_diff_eq!(g[1], -0.25, epsilon = 1e-6);
    assert_abs_diff_eq!(g[2], p[2] * (1. - p[2]), epsilon = 1e-6);
}

// ==================== Restructure ====================

#[test]
fn test_restructure_swaps_two_dims() {
    let data = (0..6).map(|i| i as f32).collect::<Vec<_>>();
    let x = Tensor::new(&data, &[1, 1, 2, 3]);
    let ctx = PassContext::default();
    let mut transpose = Restructure::new(2, 3);
    let mut outputs = run_forward(&mut transpose, &[&x], &ctx);
    assert_eq!(outputs[0].dims(), [1, 1, 3, 2]);
    assert_eq!(outputs[0].value().to_vec(), vec![0., 3., 1., 4., 2., 5.]);

    let dy = Tensor::new(&[10., 13., 11., 14., 12., 15.], &[1, 1, 3, 2]);
    let grads = run_backward(&mut transpose, &[&x], &mut outputs, &dy, &ctx);
    assert_eq!(grads[0].as_ref().unwrap().dims(), [1, 1, 2, 3]);
    assert_eq!(
        grads[0].as_ref().unwrap().to_vec(),
        vec![10., 11., 12., 13., 14., 15.]
    );

    // 卷积核前两维对调
    let f = Tensor::zeros([4, 3, 5, 5]);
    let outputs = run_forward(&mut Restructure::new(0, 1), &[&f], &ctx);
    assert_eq!(outputs[0].dims(), [3, 4, 5, 5]);

    let mut rng = StdRng::seed_from_u64(0);
    assert_err!(
        Restructure::new(1, 4).init(&[[1, 1, 1, 1]], &mut rng),
        GraphError::InvalidOperation(_)
    );
}

// ==================== Lifting ====================

#[test]
fn test_lifting_down_then_up_is_identity() {
    let data = (0..32).map(|i| i as f32).collect::<Vec<_>>();
    let x = Tensor::new(&data, &[1, 2, 4, 4]);
    let ctx = PassContext::default();

    let mut down = Lifting::new(LiftingMode::Down);
    let mut lowered = run_forward(&mut down, &[&x], &ctx);
    assert_eq!(lowered[0].dims(), [1, 8, 2, 2]);
    // 第0个2x2块的四个像素落在通道0..4的(0, 0)处
    let y = lowered[0].value().view();
    assert_eq!(
        (0..4).map(|c| y[[0, c, 0, 0]]).collect::<Vec<_>>(),
        vec![0., 1., 4., 5.]
    );

    let mut up = Lifting::new(LiftingMode::Up);
    let restored = run_forward(&mut up, &[lowered[0].value()], &ctx);
    assert_eq!(restored[0].value(), &x);

    // 反向是同一重排
    let dy = lowered[0].value().clone();
    let grads = run_backward(&mut down, &[&x], &mut lowered, &dy, &ctx);
    assert_eq!(grads[0].as_ref().unwrap(), &x);
}

#[test]
fn test_lifting_rejects_incompatible_shapes() {
    let mut rng = StdRng::seed_from_u64(0);
    assert_err!(
        Lifting::new(LiftingMode::Down).init(&[[1, 1, 3, 4]], &mut rng),
        GraphError::InvalidOperation(_)
    );
    assert_err!(
        Lifting::new(LiftingMode::Up).init(&[[1, 6, 2, 2]], &mut rng),
        GraphError::InvalidOperation(_)
    );
}
