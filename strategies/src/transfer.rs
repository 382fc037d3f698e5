//! Transfer learning: reuse configurations from similar past projects.

use crate::common::{combine_configs, emit, hash_adapt, perturb_numeric};
use crate::{StrategyInput, StrategyOutput, StrategyResult};
use holomesh_progress::ProgressBus;
use holomesh_similarity::ProjectDb;

const FINE_TUNE_FRACTION: f64 = 0.1;

/// Look up peers with `similarity >= threshold`, capped at
/// `max_recommendations`. If any exist, merge their `optimal_config` maps,
/// hash-adapt the merge to the current project, then fine-tune by 10%
/// Gaussian perturbation. Otherwise hash-adapt `initial_params` directly.
/// No in-loop scoring: the candidate is not evaluated against `targets`
/// before being returned.
pub async fn run(
    input: &StrategyInput<'_>,
    project_db: &ProjectDb,
    threshold: f64,
    max_recommendations: usize,
    progress: &ProgressBus,
) -> StrategyResult<StrategyOutput> {
    emit(progress, input, "transfer_learning_started", 0.0, "looking up similar projects", None);

    let similar = project_db.find_similar(input.project_id, input.tool_name, threshold, max_recommendations);
    let optimal_configs: Vec<_> = similar.iter().filter_map(|s| s.record.optimal_config.clone()).collect();

    let params = if optimal_configs.is_empty() {
        emit(
            progress,
            input,
            "transfer_learning_fallback",
            0.5,
            "no similar project found, adapting initial parameters directly",
            None,
        );
        hash_adapt(&input.initial_params, input.project_id)
    } else {
        let merged = combine_configs(&optimal_configs);
        let adapted = hash_adapt(&merged, input.project_id);
        perturb_numeric(&adapted, FINE_TUNE_FRACTION)
    };

    emit(progress, input, "transfer_learning_completed", 1.0, "transfer learning finished", None);

    Ok(StrategyOutput { params, iterations: 0, best_score: 0.0 })
}
