//! Runtime wiring and the `Optimize` entry point.
//!
//! Construction order is cache, queue, bus, then the orchestrator itself;
//! teardown is the reverse (`Runtime::shutdown`).

use crate::config::RuntimeConfig;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::request::{
    CacheInvalidateAck, GetRecommendationsRequest, GetRecommendationsResult, OptimizeOutcome,
    OptimizeRequest, OptimizeResult,
};
use async_trait::async_trait;
use holomesh_cache::{scoped_key, CacheEntry, CacheStats, ResultCache};
use holomesh_evaluator::{evaluate_with_timeout, DefaultScorer, Evaluator, ReferenceEvaluator, Scorer};
use holomesh_paramspace::ParamSpace;
use holomesh_progress::{ProgressBus, Subscription};
use holomesh_queue::{Task, TaskHandler, TaskQueue, TaskSnapshot};
use holomesh_similarity::{ProjectDb, ProjectRecord};
use holomesh_strategies::{
    advanced_bayesian, bayesian, confidence_score, ensemble, manual, semi_automatic, transfer,
    HoloMeshRecommender, NoopHoloMeshRecommender, NoopToolGuidanceProvider, StrategyInput, StrategyOutput,
    ToolGuidanceProvider,
};
use holomesh_types::event::Severity;
use holomesh_types::{ParamMap, ProgressEvent, Strategy, TargetMetrics, TaskStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const DEFAULT_EVALUATOR_TIMEOUT: Duration = Duration::from_secs(60);
const OPTIMIZE_QUEUE_PRIORITY: i64 = 10;
const RECENT_COMPLETED_CAP: usize = 200;

/// Everything an `Optimize` call needs, minus the queue (built separately so
/// the queue's task handler can hold a reference back to this core).
struct RuntimeCore {
    config: RuntimeConfig,
    param_space: ParamSpace,
    cache: ResultCache,
    progress: ProgressBus,
    project_db: ProjectDb,
    evaluator: Arc<dyn Evaluator>,
    scorer: Arc<dyn Scorer>,
    recommender: Arc<dyn HoloMeshRecommender>,
    guidance: Arc<dyn ToolGuidanceProvider>,
    evaluator_timeout: Duration,
}

/// Runs a queued task (enqueued via the `EnqueueTask` RPC, not via
/// `Optimize`) by evaluating its parameters directly. The generic `Task`
/// record carries no strategy or budget, so there is nothing to
/// search here — only to score and report, the same contract §4.9 gives the
/// evaluator. `Optimize` never routes through this path: it claims its own
/// task inline and drives a strategy itself.
struct EvaluatorTaskHandler {
    core: Arc<RuntimeCore>,
}

#[async_trait]
impl TaskHandler for EvaluatorTaskHandler {
    async fn handle(&self, task: &Task) -> Result<serde_json::Value, String> {
        let metrics = evaluate_with_timeout(
            self.core.evaluator.as_ref(),
            &task.tool_name,
            &task.params,
            &TargetMetrics::new(),
            self.core.evaluator_timeout,
        )
        .await
        .map_err(|e| e.to_string())?;
        serde_json::to_value(metrics).map_err(|e| e.to_string())
    }
}

/// Root runtime value owning the cache, queue, progress bus, parameter
/// space, and project DB.
pub struct Runtime {
    core: Arc<RuntimeCore>,
    queue: TaskQueue,
}

/// Collaborators a caller may override; anything left `None` falls back to
/// a reference/no-op implementation so the runtime is usable standalone.
#[derive(Default)]
pub struct RuntimeCollaborators {
    pub evaluator: Option<Arc<dyn Evaluator>>,
    pub scorer: Option<Arc<dyn Scorer>>,
    pub recommender: Option<Arc<dyn HoloMeshRecommender>>,
    pub guidance: Option<Arc<dyn ToolGuidanceProvider>>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig, collaborators: RuntimeCollaborators) -> Self {
        let mut param_space = ParamSpace::new();
        let mut seed_records = Vec::new();
        for (tool_name, tool_config) in &config.tools {
            param_space.register(tool_name.clone(), tool_config.parameter_ranges.clone());
            for profile in &tool_config.optimization_profiles {
                seed_records.push(ProjectRecord {
                    project_id: profile.project_id.clone(),
                    tool_name: tool_name.clone(),
                    context: profile.context.clone(),
                    optimal_config: Some(profile.optimal_config.clone()),
                    performance_metrics: TargetMetrics::new(),
                });
            }
        }

        let cache_ttl = Duration::from_secs(config.performance.cache_ttl_hours * 3600);
        let cache = ResultCache::new("cad_cache:", cache_ttl, 10_000);
        let project_db = ProjectDb::with_seed_records(seed_records);

        let core = Arc::new(RuntimeCore {
            config,
            param_space,
            cache,
            progress: ProgressBus::new(),
            project_db,
            evaluator: collaborators.evaluator.unwrap_or_else(|| Arc::new(ReferenceEvaluator)),
            scorer: collaborators.scorer.unwrap_or_else(|| Arc::new(DefaultScorer)),
            recommender: collaborators.recommender.unwrap_or_else(|| Arc::new(NoopHoloMeshRecommender)),
            guidance: collaborators.guidance.unwrap_or_else(|| Arc::new(NoopToolGuidanceProvider)),
            evaluator_timeout: DEFAULT_EVALUATOR_TIMEOUT,
        });

        let handler = Arc::new(EvaluatorTaskHandler { core: core.clone() });
        let queue = TaskQueue::new(handler, RECENT_COMPLETED_CAP);
        Self { core, queue }
    }

    /// Spawns the queue's worker pool (for tasks submitted via
    /// `enqueue_task`, independent of `optimize`'s inline execution path).
    pub fn start_workers(&self, num_workers: usize) -> Vec<tokio::task::JoinHandle<()>> {
        self.queue.start(num_workers)
    }

    pub fn stop_workers(&self, num_workers: usize) {
        self.queue.stop(num_workers);
    }

    /// Public entry point `Optimize(request) -> result`. Never
    /// propagates a raw error: every failure is caught and turned into
    /// `OptimizeOutcome::Error`.
    pub async fn optimize(&self, request: OptimizeRequest) -> OptimizeOutcome {
        let start = Instant::now();
        match self.try_optimize(request, start).await {
            Ok(result) => OptimizeOutcome::Ok(result),
            Err(err) => {
                warn!(error = %err, "optimize failed");
                self.core.progress.broadcast_system(format!("optimization failed: {err}"), Severity::Error);
                OptimizeOutcome::Error { message: err.to_string() }
            }
        }
    }

    async fn try_optimize(&self, request: OptimizeRequest, start: Instant) -> OrchestratorResult<OptimizeResult> {
        // Step 1: validate tool + downgrade mode if unsupported.
        let descriptors = self.core.param_space.descriptors_for(&request.tool_name)?.to_vec();
        let tool_config = self
            .core
            .config
            .tools
            .get(&request.tool_name)
            .ok_or_else(|| OrchestratorError::UnknownTool(request.tool_name.clone()))?;
        let effective_mode = downgrade_mode_if_unsupported(tool_config, request.interaction_mode);

        // Step 2: cache lookup on the project-scoped key.
        let cache_key = scoped_key(self.core.cache.prefix(), &request.tool_name, &request.project_id);
        if let Some(cached) = self.core.cache.get(&cache_key) {
            let process_id = holomesh_queue::generate_task_id(&request.tool_name, &request.project_id);
            self.core.progress.publish(progress_event(
                &process_id,
                &request.tool_name,
                &request.project_id,
                "cached_config_found",
                1.0,
                "returning cached configuration",
            ));
            return Ok(OptimizeResult {
                status: "ok".to_string(),
                process_id,
                optimized_params: cached.optimized_params,
                final_metrics: cached.final_metrics,
                method: "cached".to_string(),
                iterations: 0,
                confidence_score: 0.95,
                execution_time_seconds: start.elapsed().as_secs_f64(),
                interaction_mode: effective_mode,
                confidentiality_enabled: request.confidentiality,
                strategy_info: None,
            });
        }

        // Step 3: enqueue for accountability, then claim inline rather than
        // waiting on a worker.
        let task_id = self.queue.add(
            request.tool_name.clone(),
            request.initial_params.clone(),
            request.project_id.clone(),
            OPTIMIZE_QUEUE_PRIORITY,
        );
        let _task = self
            .queue
            .claim_for_inline_execution(&task_id)
            .expect("task was just enqueued and cannot have left pending yet");

        if effective_mode != request.interaction_mode {
            self.core.progress.publish(progress_event(
                &task_id,
                &request.tool_name,
                &request.project_id,
                "mode_downgraded",
                0.0,
                &format!("mode {} unsupported for {}, downgraded to {}", request.interaction_mode, request.tool_name, effective_mode),
            ));
        }

        // Step 4: dispatch to the chosen strategy.
        let strategy_input = StrategyInput {
            tool_name: &request.tool_name,
            project_id: &request.project_id,
            task_id: &task_id,
            initial_params: request.initial_params.clone(),
            targets: request.target_metrics.clone(),
            budget: request.budget,
            descriptors,
        };
        let strategy_output = match self.run_strategy(request.strategy, &strategy_input).await {
            Ok(output) => output,
            Err(err) => {
                self.queue.fail(&task_id, err.to_string());
                self.core.progress.publish(progress_event(
                    &task_id,
                    &request.tool_name,
                    &request.project_id,
                    "optimization_failed",
                    1.0,
                    &err.to_string(),
                ));
                return Err(err.into());
            }
        };

        // Step 5: evaluate the final configuration.
        let final_metrics = evaluate_with_timeout(
            self.core.evaluator.as_ref(),
            &request.tool_name,
            &strategy_output.params,
            &request.target_metrics,
            self.core.evaluator_timeout,
        )
        .await?;

        // Step 6: per-target improvement, reported inside strategy_info
        // since it is not named as a top-level RPC output field.
        let improvement = compute_improvement(&request.initial_params, &final_metrics, &request.target_metrics);

        // Step 7: cache the result unless confidentiality was requested.
        // Confidentiality also withholds the project DB write (invariant 9:
        // a confidential Manual run must leave the project DB size alone).
        if !request.confidentiality {
            self.core.cache.put(
                cache_key,
                request.tool_name.clone(),
                request.project_id.clone(),
                CacheEntry {
                    optimized_params: strategy_output.params.clone(),
                    final_metrics: final_metrics.clone(),
                    created_at: chrono::Utc::now(),
                },
                None,
            )?;
            self.core.project_db.upsert(ProjectRecord {
                project_id: request.project_id.clone(),
                tool_name: request.tool_name.clone(),
                context: request.initial_params.clone(),
                optimal_config: Some(strategy_output.params.clone()),
                performance_metrics: final_metrics.clone(),
            });
        }

        self.queue.complete(&task_id, serde_json::json!({"optimized_params": strategy_output.params}));

        let confidence = confidence_score(request.strategy, strategy_output.iterations, effective_mode);

        // Step 8: publish completion and return.
        self.core.progress.publish(progress_event(
            &task_id,
            &request.tool_name,
            &request.project_id,
            "optimization_completed",
            1.0,
            "optimization finished",
        ));

        Ok(OptimizeResult {
            status: "ok".to_string(),
            process_id: task_id,
            optimized_params: strategy_output.params,
            final_metrics,
            method: strategy_label(request.strategy).to_string(),
            iterations: strategy_output.iterations,
            confidence_score: confidence,
            execution_time_seconds: start.elapsed().as_secs_f64(),
            interaction_mode: effective_mode,
            confidentiality_enabled: request.confidentiality,
            strategy_info: Some(serde_json::json!({ "improvement": improvement })),
        })
    }

    async fn run_strategy(
        &self,
        strategy: Strategy,
        input: &StrategyInput<'_>,
    ) -> Result<StrategyOutput, holomesh_strategies::StrategyError> {
        let threshold = self.core.config.recommendations.similarity_threshold;
        let max_recommendations = self.core.config.recommendations.max_recommendations;
        match strategy {
            Strategy::Bayesian => bayesian::run(input, self.core.scorer.as_ref(), &self.core.progress).await,
            Strategy::AdvancedBayesian => {
                advanced_bayesian::run(input, self.core.scorer.as_ref(), &self.core.progress).await
            }
            Strategy::TransferLearning => {
                transfer::run(input, &self.core.project_db, threshold, max_recommendations, &self.core.progress).await
            }
            Strategy::Ensemble => {
                ensemble::run(
                    input,
                    self.core.scorer.as_ref(),
                    &self.core.project_db,
                    threshold,
                    max_recommendations,
                    &self.core.progress,
                )
                .await
            }
            Strategy::SemiAutomatic => {
                semi_automatic::run(input, self.core.recommender.as_ref(), self.core.scorer.as_ref(), &self.core.progress)
                    .await
            }
            Strategy::Manual => manual::run(input, self.core.guidance.as_ref(), &self.core.progress).await,
        }
    }

    /// `GetRecommendations(tool_name, project_context) -> result`. Falls back to the tool's configured `default_parameters`
    /// when no similar project clears the similarity threshold.
    pub fn get_recommendations(&self, request: GetRecommendationsRequest) -> OrchestratorResult<GetRecommendationsResult> {
        let tool_config = self
            .core
            .config
            .tools
            .get(&request.tool_name)
            .ok_or_else(|| OrchestratorError::UnknownTool(request.tool_name.clone()))?;

        let threshold = self.core.config.recommendations.similarity_threshold;
        let max_recommendations = self.core.config.recommendations.max_recommendations;
        let similar = self.core.project_db.recommend(&request.tool_name, &request.project_context, threshold, max_recommendations);

        if similar.is_empty() {
            let manual_enabled = self
                .core
                .config
                .interaction_modes
                .get("manual")
                .map(|m| m.holomesh_integration)
                .unwrap_or(false);
            let entry = self.core.config.recommendations.confidence_scoring.get("default_parameters");
            let confidence = match entry {
                Some(e) if manual_enabled => (e.base_score + e.bonus).min(0.95),
                Some(e) => e.base_score,
                None if manual_enabled => 0.80,
                None => 0.75,
            };
            return Ok(GetRecommendationsResult {
                recommended_params: tool_config.default_parameters.clone(),
                confidence_score: confidence,
                source: "default_parameters".to_string(),
                similar_projects_used: 0,
            });
        }

        let top = &similar[0];
        let entry = self.core.config.recommendations.confidence_scoring.get("similarity_match");
        let confidence = match entry {
            Some(e) => (e.base_score + e.bonus * top.similarity).min(0.95),
            None => (0.6 + 0.35 * top.similarity).min(0.95),
        };
        let recommended = top.record.optimal_config.clone().unwrap_or_else(|| tool_config.default_parameters.clone());

        Ok(GetRecommendationsResult {
            recommended_params: recommended,
            confidence_score: confidence,
            source: "similarity_match".to_string(),
            similar_projects_used: similar.len(),
        })
    }

    pub fn enqueue_task(&self, tool_name: impl Into<String>, params: ParamMap, project_id: impl Into<String>, priority: i64) -> String {
        self.queue.add(tool_name, params, project_id, priority)
    }

    pub fn task_status(&self, task_id: &str) -> Option<TaskSnapshot> {
        self.queue.status(task_id)
    }

    pub fn list_tasks(&self, status_filter: Option<TaskStatus>) -> Vec<TaskSnapshot> {
        self.queue.list(status_filter)
    }

    pub fn cancel_task(&self, task_id: &str) -> bool {
        self.queue.cancel(task_id).is_ok()
    }

    pub fn subscribe_progress(&self, task_id: &str) -> Subscription {
        self.core.progress.subscribe(task_id)
    }

    pub fn invalidate_cache(&self, tool_name: Option<&str>, project_id: Option<&str>) -> CacheInvalidateAck {
        CacheInvalidateAck { removed: self.core.cache.invalidate(tool_name, project_id) }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.core.cache.stats()
    }

    pub fn project_db_size(&self) -> usize {
        // Diagnostic only; used by confidentiality invariant tests to assert the project DB did not grow.
        self.core.project_db.len()
    }
}

fn downgrade_mode_if_unsupported(
    tool_config: &crate::config::ToolConfig,
    requested: holomesh_types::InteractionMode,
) -> holomesh_types::InteractionMode {
    use holomesh_types::InteractionMode;
    if tool_config.supported_modes.contains(&requested) {
        return requested;
    }
    if tool_config.supported_modes.contains(&InteractionMode::Professional) {
        InteractionMode::Professional
    } else {
        tool_config.supported_modes.first().copied().unwrap_or(InteractionMode::Professional)
    }
}

fn strategy_label(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Bayesian => "bayesian",
        Strategy::AdvancedBayesian => "advanced_bayesian",
        Strategy::TransferLearning => "transfer_learning",
        Strategy::Ensemble => "ensemble",
        Strategy::SemiAutomatic => "semi_automatic",
        Strategy::Manual => "manual",
    }
}

/// `(|initial-target| - |optimized-target|) / |initial-target|` per target
/// metric, when the denominator is nonzero.
fn compute_improvement(initial_params: &ParamMap, final_metrics: &TargetMetrics, targets: &TargetMetrics) -> TargetMetrics {
    targets
        .iter()
        .filter_map(|(metric, target)| {
            let initial_distance = initial_params.get(metric).and_then(|v| v.as_numeric()).map(|v| (v - target).abs());
            let optimized_distance = final_metrics.get(metric).map(|v| (v - target).abs());
            match (initial_distance, optimized_distance) {
                (Some(initial), Some(optimized)) if initial.abs() > f64::EPSILON => {
                    Some((metric.clone(), (initial - optimized) / initial))
                }
                _ => None,
            }
        })
        .collect()
}

fn progress_event(task_id: &str, tool_name: &str, project_id: &str, stage: &str, progress: f64, message: &str) -> ProgressEvent {
    ProgressEvent {
        task_id: task_id.to_string(),
        tool_name: tool_name.to_string(),
        project_id: project_id.to_string(),
        stage: stage.to_string(),
        progress,
        message: message.to_string(),
        metrics: None,
        severity: Some(Severity::Info),
        timestamp: chrono::Utc::now(),
        seq: 0,
    }
}
