/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : 对抗训练的最小示例：一维生成器 + 判别器，共用一张图
 *                 - 判别器的输入由复用器在“真实数据”和“生成数据”间切换
 *                 - 生成器与判别器的参数分属两个求解器组，交替更新
 *                 - "sample"相位下，生成器改用固定噪声（相位复用器），只有采样探针参与前向
 */
use deep_flow::nn::{
    AdamParams, Graph, GraphError, Initializer, LossReduction, MultiplexerHandle, PhaseBehaviour,
    Session,
};
use deep_flow::tensor::Tensor;

const BATCH: usize = 8;
const REAL_VALUE: f32 = 3.;

fn build_gan_graph() -> Result<Graph, GraphError> {
    let mut graph = Graph::with_name_and_seed("toy_gan", 2024);
    graph.define_phase("train", PhaseBehaviour::Train)?;
    graph.define_phase("sample", PhaseBehaviour::Inference)?;
    let adam = AdamParams {
        learning_rate: 0.05,
        ..Default::default()
    };
    graph.adam_solver(adam, "gen")?;
    graph.adam_solver(adam, "dis")?;

    // ========== 生成器 ==========
    let noise = graph.data_generator(Initializer::random_uniform(&[BATCH, 1], -1., 1.), Some("noise"))?;
    let fixed_noise = graph.variable(Initializer::fill(&[BATCH, 1], 0.5), None, Some("fixed_noise"))?;
    let z = graph.phaseplexer(&[(noise, "train"), (fixed_noise, "sample")], Some("z"))?;
    let g_w = graph.variable(Initializer::fill(&[1, 1], 0.1), Some("gen"), Some("g_w"))?;
    let g_b = graph.variable(Initializer::zeros(&[1]), Some("gen"), Some("g_b"))?;
    let fake = graph.matmul(z, g_w, None)?;
    let fake = graph.bias_add(fake, g_b, Some("fake"))?;

    // ========== 判别器 ==========
    let real = graph.place_holder(&[BATCH, 1], Some("real"))?;
    let mux = graph.multiplexer(&[real.output(), fake], Some("mux"))?;
    let d_w = graph.variable(Initializer::fill(&[1, 1], 0.5), Some("dis"), Some("d_w"))?;
    let d_b = graph.variable(Initializer::zeros(&[1]), Some("dis"), Some("d_b"))?;
    let logit = graph.matmul(mux.output(), d_w, None)?;
    let logit = graph.bias_add(logit, d_b, Some("logit"))?;
    let prob = graph.sigmoid(logit, Some("prob"))?;
    let target = graph.place_holder(&[BATCH, 1], Some("target"))?;
    let err = graph.square_error(prob, target.output(), Some("err"))?;

    // ========== 各相位的损失 ==========
    graph.set_default_phases(&["train"])?;
    graph.loss(err, None, LossReduction::Avg, Some("d_loss"))?;
    graph.set_default_phases(&["sample"])?;
    graph.loss(fake, None, LossReduction::Avg, Some("sample_mean"))?;
    graph.set_default_phases(&[])?;
    Ok(graph)
}

/// 选定判别器的输入与目标，执行一次前向+反向
fn pass(session: &mut Session, mux: MultiplexerHandle, input: usize, target: f32) -> Result<f32, GraphError> {
    session.select_input(mux, Some(input))?;
    let target_handle = session.placeholder("target")?;
    session.graph_mut().fill_values(target_handle, target)?;
    session.forward()?;
    session.backward()?;
    Ok(session.value_of("d_loss")?.number().unwrap_or(f32::NAN))
}

fn scalar(session: &Session, name: &str) -> f32 {
    session.value_of(name).unwrap().number().unwrap()
}

#[test]
fn test_gan_alternating_solver_groups() -> Result<(), GraphError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut session = Session::new(build_gan_graph()?);
    session.initialize(Default::default())?;

    let real = session.placeholder("real")?;
    session.write_values(real, &Tensor::full(REAL_VALUE, [BATCH, 1, 1, 1]))?;
    let mux = session.multiplexer("mux")?;

    // 未选中任何输入时判别器分支整体不执行
    session.set_phase(Some("train"))?;
    session.forward()?;
    assert!(session.graph().loss_values().is_empty());

    session.set_phase(Some("sample"))?;
    session.forward()?;
    let initial_sample = scalar(&session, "sample_mean");
    assert!((initial_sample - 0.05).abs() < 1e-6);
    assert_eq!(session.get_node("noise")?.forward_count(), 0);

    for _ in 0..300 {
        session.set_phase(Some("train"))?;

        // 判别器：真实数据判为1，生成数据判为0；只更新"dis"组
        let g_w = scalar(&session, "g_w");
        pass(&mut session, mux, 0, 1.)?;
        pass(&mut session, mux, 1, 0.)?;
        session.apply_solvers(Some(&["dis"]))?;
        session.reset_gradients();
        assert_eq!(scalar(&session, "g_w"), g_w);

        // 生成器：希望生成数据被判为1；只更新"gen"组
        let d_w = scalar(&session, "d_w");
        let g_loss = pass(&mut session, mux, 1, 1.)?;
        session.apply_solvers(Some(&["gen"]))?;
        session.reset_gradients();
        assert_eq!(scalar(&session, "d_w"), d_w);
        assert!(g_loss.is_finite());
        assert_eq!(session.graph().loss_values().len(), 1);
    }

    session.set_phase(Some("sample"))?;
    session.forward()?;
    let final_sample = scalar(&session, "sample_mean");
    println!("生成数据均值：{initial_sample:.3} -> {final_sample:.3}（真实数据为{REAL_VALUE}）");
    assert!(final_sample.is_finite());
    // 判别器学会“越大越真”之后，生成器的偏置被推向真实数据
    assert!(scalar(&session, "g_b") > 0.5);
    Ok(())
}
