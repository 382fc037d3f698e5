//! Plain Bayesian optimization.

use crate::common::emit;
use crate::{ensure_descriptors, StrategyInput, StrategyOutput, StrategyResult};
use holomesh_acquisition::search_next_point;
use holomesh_evaluator::Scorer;
use holomesh_paramspace::{denormalize, normalize, random_sample};
use holomesh_progress::ProgressBus;
use holomesh_surrogate::{GaussianProcess, Kernel};
use holomesh_types::Sample;
use rand::Rng;
use tracing::warn;

/// 1. `min(5, budget)` random samples, all scored. 2. Fit the GP.
/// 3. Loop to `budget`: EI-search the next point, score it, append, refit,
/// update best-so-far.
pub async fn run(
    input: &StrategyInput<'_>,
    scorer: &dyn Scorer,
    progress: &ProgressBus,
) -> StrategyResult<StrategyOutput> {
    ensure_descriptors(&input.descriptors)?;
    let dims = input.descriptors.len();

    emit(progress, input, "bayesian_started", 0.0, "starting Bayesian optimization", None);

    let mut samples: Vec<Sample> = Vec::new();
    let mut best_params = input.initial_params.clone();
    let mut best_score = f64::NEG_INFINITY;

    let n_initial = input.budget.min(5);
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

    let mut gp = GaussianProcess::new(Kernel::default(), 1e-6);
    if !samples.is_empty() {
        let xs: Vec<Vec<f64>> = samples.iter().map(|s| s.vector.clone()).collect();
        let ys: Vec<f64> = samples.iter().map(|s| s.fitness).collect();
        let _ = gp.fit(xs, ys);
    }

    for i in n_initial..input.budget {
        let fraction = (i + 1) as f64 / input.budget.max(1) as f64;
        emit(progress, input, "optimization_progress", fraction, "searching next candidate", None);

        let next_vector = if gp.is_fitted() {
            let anchor = normalize(&best_params, &input.descriptors);
            search_next_point(&gp, dims, best_score, &anchor)
        } else {
            let mut rng = rand::thread_rng();
            (0..dims).map(|_| rng.gen_range(0.0..=1.0)).collect()
        };

        let candidate = denormalize(&next_vector, &input.descriptors, &input.initial_params)?;
        let score = scorer.score(&candidate, &input.targets);
        samples.push(Sample::new(next_vector, score));

        let xs: Vec<Vec<f64>> = samples.iter().map(|s| s.vector.clone()).collect();
        let ys: Vec<f64> = samples.iter().map(|s| s.fitness).collect();
        if gp.fit(xs, ys).is_err() {
            warn!(tool_name = input.tool_name, "gp refit failed mid-run, keeping previous fit");
        }

        if score > best_score {
            best_score = score;
            best_params = candidate;
            emit(progress, input, "best_config_update", fraction, "new best configuration found", None);
        }
    }

    emit(progress, input, "bayesian_completed", 1.0, "Bayesian optimization finished", None);

    Ok(StrategyOutput { params: best_params, iterations: input.budget, best_score })
}

#[cfg(test)]
mod tests {
    use super::*;
    use holomesh_evaluator::DefaultScorer;
    use holomesh_types::{ParamMap, ParameterDescriptor};

    fn descriptors() -> Vec<ParameterDescriptor> {
        vec![ParameterDescriptor::integer("optimization_level", 0, 3)]
    }

    #[tokio::test]
    async fn best_score_never_decreases_across_iterations() {
        let mut initial = ParamMap::new();
        initial.insert("optimization_level".into(), holomesh_types::ParamValue::Int(1));
        let input = StrategyInput {
            tool_name: "yosys",
            project_id: "projA",
            task_id: "task1",
            initial_params: initial,
            targets: [("optimization_level".to_string(), 3.0)].into_iter().collect(),
            budget: 10,
            descriptors: descriptors(),
        };
        let progress = ProgressBus::new();
        let output = run(&input, &DefaultScorer, &progress).await.unwrap();
        assert!(output.best_score.is_finite());
    }

    #[tokio::test]
    async fn rejects_empty_descriptor_set() {
        let input = StrategyInput {
            tool_name: "yosys",
            project_id: "projA",
            task_id: "task1",
            initial_params: ParamMap::new(),
            targets: Default::default(),
            budget: 5,
            descriptors: Vec::new(),
        };
        let progress = ProgressBus::new();
        assert!(run(&input, &DefaultScorer, &progress).await.is_err());
    }
}
