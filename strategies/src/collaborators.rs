//! External collaborator contracts consulted by the interactive strategies.

use async_trait::async_trait;
use holomesh_types::{InteractionMode, ParamMap, TargetMetrics};

/// Consulted by the Semi-Automatic strategy. Returns `None`
/// when the recommender has no opinion, in which case the strategy proceeds
/// on `initial_params` unblended.
#[async_trait]
pub trait HoloMeshRecommender: Send + Sync {
    async fn get_recommendations(
        &self,
        tool_name: &str,
        params: &ParamMap,
        targets: &TargetMetrics,
        mode: InteractionMode,
    ) -> Option<ParamMap>;
}

/// Consulted by the Manual strategy.
#[async_trait]
pub trait ToolGuidanceProvider: Send + Sync {
    async fn get_tool_guidance(
        &self,
        tool_name: &str,
        params: &ParamMap,
        targets: &TargetMetrics,
    ) -> Option<ParamMap>;
}

/// No-op collaborator: always abstains. Used as the orchestrator's default
/// until a real recommender/guidance service is wired in, mirroring
/// `holomesh-evaluator::ReferenceEvaluator`'s role as a stand-in.
#[derive(Debug, Default, Clone)]
pub struct NoopHoloMeshRecommender;

#[async_trait]
impl HoloMeshRecommender for NoopHoloMeshRecommender {
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

#[derive(Debug, Default, Clone)]
pub struct NoopToolGuidanceProvider;

#[async_trait]
impl ToolGuidanceProvider for NoopToolGuidanceProvider {
    async fn get_tool_guidance(
        &self,
        _tool_name: &str,
        _params: &ParamMap,
        _targets: &TargetMetrics,
    ) -> Option<ParamMap> {
        None
    }
}
