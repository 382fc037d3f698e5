//! Advanced Bayesian optimization: GP + neural-network co-surrogate with
//! adaptive kernel switching.

use crate::common::emit;
use crate::{ensure_descriptors, StrategyInput, StrategyOutput, StrategyResult};
use holomesh_acquisition::search_next_point;
use holomesh_evaluator::Scorer;
use holomesh_paramspace::{denormalize, normalize, random_sample};
use holomesh_progress::ProgressBus;
use holomesh_surrogate::adaptive;
use holomesh_surrogate::{GaussianProcess, Kernel, NeuralNetworkSurrogate};
use holomesh_types::Sample;
use rand::Rng;
use tracing::warn;

const NN_HIDDEN_DIM: usize = 8;
const NN_INITIAL_EPOCHS: usize = 50;
const NN_RETRAIN_EPOCHS: usize = 20;
const NN_RETRAIN_THRESHOLD: usize = 20;
const NN_RETRAIN_PERIOD: usize = 10;

/// Seed uses `min(8, budget/3)` samples; both GP and NN fit on them. Each
/// iteration blends `0.7*EI-point + 0.3*NN-suggested-point` in vector space
/// — the NN does not propose an independently-searched point, only the
/// current best re-expressed as a vector. The NN retrains whenever the buffer size
/// crosses a multiple of 10 beyond 20. Kernel adaptation runs as in §4.2.
pub async fn run(
    input: &StrategyInput<'_>,
    scorer: &dyn Scorer,
    progress: &ProgressBus,
) -> StrategyResult<StrategyOutput> {
    ensure_descriptors(&input.descriptors)?;
    let dims = input.descriptors.len();

    emit(progress, input, "advanced_bayesian_started", 0.0, "starting advanced Bayesian optimization", None);

    let mut samples: Vec<Sample> = Vec::new();
    let mut best_params = input.initial_params.clone();
    let mut best_score = f64::NEG_INFINITY;

    let n_initial = (input.budget / 3).min(8);
    for _ in 0..n_initial {
        let candidate = random_sample(&input.descriptors);
        let vector = normalize(&candidate, &input.descriptors);
        let score = scorer.score(&candidate, &input.targets);
        samples.push(Sample::new(vector, score));
        if score > best_score {
            best_score = score;
            best_params = candidate;
            emit(progress, input, "best_config_update", 0.0, "new best configuration found", None);
        }
    }

    let mut gp = GaussianProcess::new(Kernel::Combined { length_scale: 1.0, period: 1.0 }, 1e-6);
    let mut nn = NeuralNetworkSurrogate::new(dims, NN_HIDDEN_DIM);
    if !samples.is_empty() {
        let xs: Vec<Vec<f64>> = samples.iter().map(|s| s.vector.clone()).collect();
        let ys: Vec<f64> = samples.iter().map(|s| s.fitness).collect();
        let _ = gp.fit(xs.clone(), ys.clone());
        nn.fit(&xs, &ys, NN_INITIAL_EPOCHS);
    }

    for i in n_initial..input.budget {
        let fraction = (i + 1) as f64 / input.budget.max(1) as f64;
        emit(progress, input, "optimization_progress", fraction, "searching next candidate", None);

        if adaptive::is_adaptation_checkpoint(i, samples.len()) {
            let ys: Vec<f64> = samples.iter().map(|s| s.fitness).collect();
            let (convergence, stability) = adaptive::performance_metrics(&ys);
            let adapted = adaptive::adapt_kernel(gp.kernel(), convergence, stability);
            if adapted != gp.kernel() {
                gp.set_kernel(adapted);
                let xs: Vec<Vec<f64>> = samples.iter().map(|s| s.vector.clone()).collect();
                let _ = gp.fit(xs, ys);
            }
        }

        let anchor = normalize(&best_params, &input.descriptors);
        let gp_point = if gp.is_fitted() {
            search_next_point(&gp, dims, best_score, &anchor)
        } else {
            let mut rng = rand::thread_rng();
            (0..dims).map(|_| rng.gen_range(0.0..=1.0)).collect()
        };
        let nn_point = anchor;
        let blended: Vec<f64> = gp_point
            .iter()
            .zip(nn_point.iter())
            .map(|(g, n)| (0.7 * g + 0.3 * n).clamp(0.0, 1.0))
            .collect();

        let candidate = denormalize(&blended, &input.descriptors, &input.initial_params)?;
        let score = scorer.score(&candidate, &input.targets);
        samples.push(Sample::new(blended, score));

        let xs: Vec<Vec<f64>> = samples.iter().map(|s| s.vector.clone()).collect();
        let ys: Vec<f64> = samples.iter().map(|s| s.fitness).collect();
        if gp.fit(xs.clone(), ys.clone()).is_err() {
            warn!(tool_name = input.tool_name, "gp refit failed mid-run, keeping previous fit");
        }
        if samples.len() > NN_RETRAIN_THRESHOLD && samples.len() % NN_RETRAIN_PERIOD == 0 {
            nn.fit(&xs, &ys, NN_RETRAIN_EPOCHS);
        }

        if score > best_score {
            best_score = score;
            best_params = candidate;
            emit(progress, input, "best_config_update", fraction, "new best configuration found", None);
        }
    }

    emit(progress, input, "advanced_bayesian_completed", 1.0, "advanced Bayesian optimization finished", None);

    Ok(StrategyOutput { params: best_params, iterations: input.budget, best_score })
}

#[cfg(test)]
mod tests {
    use super::*;
    use holomesh_evaluator::DefaultScorer;
    use holomesh_types::{ParamMap, ParameterDescriptor, ParamValue};

    #[tokio::test]
    async fn runs_to_completion_and_reports_budget_as_iterations() {
        let mut initial = ParamMap::new();
        initial.insert("optimization_level".into(), ParamValue::Int(1));
        let input = StrategyInput {
            tool_name: "yosys",
            project_id: "projA",
            task_id: "task1",
            initial_params: initial,
            targets: [("optimization_level".to_string(), 3.0)].into_iter().collect(),
            budget: 9,
            descriptors: vec![ParameterDescriptor::integer("optimization_level", 0, 3)],
        };
        let progress = ProgressBus::new();
        let output = run(&input, &DefaultScorer, &progress).await.unwrap();
        assert_eq!(output.iterations, 9);
    }

    #[tokio::test]
    async fn small_budget_with_zero_initial_samples_still_completes() {
        let input = StrategyInput {
            tool_name: "yosys",
            project_id: "projA",
            task_id: "task1",
            initial_params: ParamMap::new(),
            targets: Default::default(),
            budget: 2,
            descriptors: vec![ParameterDescriptor::integer("optimization_level", 0, 3)],
        };
        let progress = ProgressBus::new();
        let output = run(&input, &DefaultScorer, &progress).await.unwrap();
        assert_eq!(output.iterations, 2);
    }
}
