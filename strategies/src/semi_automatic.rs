//! Semi-Automatic: blend a recommender's suggestion with the current
//! parameters, then refine briefly with Bayesian optimization.

use crate::common::{blend_params, emit};
use crate::{bayesian, HoloMeshRecommender, StrategyInput, StrategyOutput, StrategyResult};
use holomesh_evaluator::Scorer;
use holomesh_progress::ProgressBus;
use holomesh_types::InteractionMode;

const CURRENT_WEIGHT: f64 = 0.7;
const RECOMMENDATION_WEIGHT: f64 = 0.3;
const REFINEMENT_BUDGET: usize = 20;

/// Ask the recommender for suggestions, blend them `0.7` current / `0.3`
/// recommended, then spend a fixed 20-iteration Bayesian refinement on the
/// blend. If the recommender abstains, refine `initial_params` unblended.
pub async fn run(
    input: &StrategyInput<'_>,
    recommender: &dyn HoloMeshRecommender,
    scorer: &dyn Scorer,
    progress: &ProgressBus,
) -> StrategyResult<StrategyOutput> {
    emit(progress, input, "semi_automatic_started", 0.0, "requesting recommendations", None);

    let recommendation = recommender
        .get_recommendations(input.tool_name, &input.initial_params, &input.targets, InteractionMode::SemiAutomatic)
        .await;

    let blended = match recommendation {
        Some(recommended) => {
            emit(progress, input, "recommendations_received", 0.3, "blending with recommended configuration", None);
            blend_params(&input.initial_params, &recommended, CURRENT_WEIGHT, RECOMMENDATION_WEIGHT)
        }
        None => {
            emit(progress, input, "no_recommendations", 0.3, "no recommendations available, refining as-is", None);
            input.initial_params.clone()
        }
    };

    let refinement_input = input.with_budget(REFINEMENT_BUDGET).with_initial_params(blended);
    let output = bayesian::run(&refinement_input, scorer, progress).await?;

    emit(progress, input, "semi_automatic_completed", 1.0, "semi-automatic optimization finished", None);

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use holomesh_evaluator::DefaultScorer;
    use holomesh_types::{ParamMap, ParameterDescriptor, ParamValue, TargetMetrics};

    struct FixedRecommender(ParamMap);

    #[async_trait]
    impl HoloMeshRecommender for FixedRecommender {
        async fn get_recommendations(
            &self,
            _tool_name: &str,
            _params: &ParamMap,
            _targets: &TargetMetrics,
            _mode: InteractionMode,
        ) -> Option<ParamMap> {
            Some(self.0.clone())
        }
    }

    fn input() -> StrategyInput<'static> {
        let mut initial = ParamMap::new();
        initial.insert("optimization_level".into(), ParamValue::Int(1));
        StrategyInput {
            tool_name: "yosys",
            project_id: "projA",
            task_id: "task1",
            initial_params: initial,
            targets: [("optimization_level".to_string(), 3.0)].into_iter().collect(),
            budget: 50,
            descriptors: vec![ParameterDescriptor::integer("optimization_level", 0, 3)],
        }
    }

    #[tokio::test]
    async fn blends_recommendation_before_refining() {
        let mut recommended = ParamMap::new();
        recommended.insert("optimization_level".into(), ParamValue::Int(3));
        let recommender = FixedRecommender(recommended);
        let progress = ProgressBus::new();
        let output = run(&input(), &recommender, &DefaultScorer, &progress).await.unwrap();
        assert_eq!(output.iterations, REFINEMENT_BUDGET);
    }

    #[tokio::test]
    async fn refines_unblended_when_recommender_abstains() {
        struct Abstaining;
        #[async_trait]
        impl HoloMeshRecommender for Abstaining {
            async fn get_recommendations(
                &self,
                _tool_name: &str,
                _params: &ParamMap,
                _targets: &TargetMetrics,
                _mode: InteractionMode,
            ) -> Option<ParamMap> {
                None
            }
        }
        let progress = ProgressBus::new();
        let output = run(&input(), &Abstaining, &DefaultScorer, &progress).await.unwrap();
        assert_eq!(output.iterations, REFINEMENT_BUDGET);
    }
}
