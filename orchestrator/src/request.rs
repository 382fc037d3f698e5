//! Request/response types for the RPC surface.

use holomesh_types::{InteractionMode, ParamMap, Strategy, TargetMetrics};
use serde::{Deserialize, Serialize};

/// `Optimize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub tool_name: String,
    pub project_id: String,
    pub initial_params: ParamMap,
    pub target_metrics: TargetMetrics,
    pub strategy: Strategy,
    pub budget: usize,
    pub interaction_mode: InteractionMode,
    pub confidentiality: bool,
}

/// Successful `Optimize` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeResult {
    pub status: String,
    pub process_id: String,
    pub optimized_params: ParamMap,
    pub final_metrics: TargetMetrics,
    pub method: String,
    pub iterations: usize,
    pub confidence_score: f64,
    pub execution_time_seconds: f64,
    pub interaction_mode: InteractionMode,
    pub confidentiality_enabled: bool,
    pub strategy_info: Option<serde_json::Value>,
}

/// `Optimize` never lets a subsystem error escape raw; this is
/// the structured result the boundary always returns instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OptimizeOutcome {
    Ok(OptimizeResult),
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRecommendationsRequest {
    pub tool_name: String,
    pub project_context: ParamMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRecommendationsResult {
    pub recommended_params: ParamMap,
    pub confidence_score: f64,
    pub source: String,
    pub similar_projects_used: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheInvalidateAck {
    pub removed: usize,
}
