//! Manual: blend tool-authored guidance with the current parameters and
//! stop there, no refinement loop.

use crate::common::{blend_params, emit};
use crate::{StrategyInput, StrategyOutput, StrategyResult, ToolGuidanceProvider};
use holomesh_progress::ProgressBus;

const CURRENT_WEIGHT: f64 = 0.9;
const GUIDANCE_WEIGHT: f64 = 0.1;

/// Ask for tool guidance, blend it `0.9` current / `0.1` guidance, and return
/// immediately — there is no scoring or iterative refinement here.
/// Confidentiality handling for manual submissions belongs to the caller,
/// since a strategy's output carries no such flag.
pub async fn run(
    input: &StrategyInput<'_>,
    guidance: &dyn ToolGuidanceProvider,
    progress: &ProgressBus,
) -> StrategyResult<StrategyOutput> {
    emit(progress, input, "manual_started", 0.0, "requesting tool guidance", None);

    let suggestion = guidance.get_tool_guidance(input.tool_name, &input.initial_params, &input.targets).await;

    let params = match suggestion {
        Some(guided) => {
            emit(progress, input, "guidance_received", 0.5, "blending with tool guidance", None);
            blend_params(&input.initial_params, &guided, CURRENT_WEIGHT, GUIDANCE_WEIGHT)
        }
        None => {
            emit(progress, input, "no_guidance", 0.5, "no guidance available, keeping current parameters", None);
            input.initial_params.clone()
        }
    };

    emit(progress, input, "manual_completed", 1.0, "manual configuration finished", None);

    Ok(StrategyOutput { params, iterations: 0, best_score: 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use holomesh_types::{ParamMap, ParamValue, TargetMetrics};

    struct FixedGuidance(ParamMap);

    #[async_trait]
    impl ToolGuidanceProvider for FixedGuidance {
        async fn get_tool_guidance(&self, _tool_name: &str, _params: &ParamMap, _targets: &TargetMetrics) -> Option<ParamMap> {
            Some(self.0.clone())
        }
    }

    #[tokio::test]
    async fn blends_guidance_with_a_strong_bias_toward_current() {
        let mut initial = ParamMap::new();
        initial.insert("clock_period".into(), ParamValue::Float(10.0));
        let mut guided = ParamMap::new();
        guided.insert("clock_period".into(), ParamValue::Float(0.0));
        let input = StrategyInput {
            tool_name: "yosys",
            project_id: "projA",
            task_id: "task1",
            initial_params: initial,
            targets: TargetMetrics::new(),
            budget: 0,
            descriptors: Vec::new(),
        };
        let progress = ProgressBus::new();
        let output = run(&input, &FixedGuidance(guided), &progress).await.unwrap();
        let v = output.params["clock_period"].as_numeric().unwrap();
        assert!((v - 9.0).abs() < 1e-9);
    }
}
