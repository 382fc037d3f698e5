//! Ensemble: blend a Bayesian sub-run with a transfer-learning sub-run.

use crate::common::{emit, weighted_combine_configs};
use crate::{bayesian, transfer, StrategyInput, StrategyOutput, StrategyResult};
use holomesh_evaluator::Scorer;
use holomesh_progress::ProgressBus;
use holomesh_similarity::ProjectDb;

const BAYESIAN_WEIGHT: f64 = 0.6;
const TRANSFER_WEIGHT: f64 = 0.4;

/// Runs Bayesian (weight 0.6) on a `0.6*budget` slice, then Transfer
/// Learning (weight 0.4); combines the two results by weighted mean over
/// numeric fields, falling back to the Bayesian result's value for
/// non-numeric keys.
pub async fn run(
    input: &StrategyInput<'_>,
    scorer: &dyn Scorer,
    project_db: &ProjectDb,
    threshold: f64,
    max_recommendations: usize,
    progress: &ProgressBus,
) -> StrategyResult<StrategyOutput> {
    emit(progress, input, "ensemble_started", 0.0, "starting ensemble optimization", None);

    let bayesian_budget = ((input.budget as f64) * BAYESIAN_WEIGHT).round().max(1.0) as usize;
    let bayesian_input = input.with_budget(bayesian_budget);
    let bayesian_output = bayesian::run(&bayesian_input, scorer, progress).await?;

    let transfer_output = transfer::run(input, project_db, threshold, max_recommendations, progress).await?;

    let combined = weighted_combine_configs(
        &[bayesian_output.params, transfer_output.params],
        &[BAYESIAN_WEIGHT, TRANSFER_WEIGHT],
    );

    emit(progress, input, "ensemble_completed", 1.0, "ensemble optimization finished", None);

    Ok(StrategyOutput {
        params: combined,
        iterations: bayesian_output.iterations,
        best_score: bayesian_output.best_score.max(transfer_output.best_score),
    })
}
