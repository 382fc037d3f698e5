//! Evaluator interface and reference implementation, plus the scoring rule
//! shared by every strategy.
//!
//! There are two distinct fitness functions in play here: a synthetic
//! in-loop score used as the optimization objective, and a separate
//! final-metrics evaluation used once a strategy has returned. We keep
//! that split explicit as two traits:
//! [`Scorer`] is the in-loop objective every strategy searches against;
//! [`Evaluator`] is the external collaborator the orchestrator calls exactly
//! once, after a strategy completes, to report real-world metrics.

use async_trait::async_trait;
use holomesh_types::{ParamMap, TargetMetrics};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("evaluator timed out after {0:?}")]
    Timeout(Duration),
    #[error("evaluator failed: {0}")]
    Failed(String),
}

/// External collaborator contract: score a candidate against target
/// metrics. Must be idempotent in its inputs; the orchestrator treats it as
/// side-effect-free for the duration of one optimization.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        tool_name: &str,
        params: &ParamMap,
    ) -> Result<TargetMetrics, EvaluatorError>;
}

/// Calls `evaluator.evaluate` with an enforced timeout. A timed-out call
/// substitutes a worst-case metrics map (every target value maximally far
/// from its goal) so the caller can proceed with a degraded but valid score
/// rather than blocking indefinitely.
pub async fn evaluate_with_timeout(
    evaluator: &dyn Evaluator,
    tool_name: &str,
    params: &ParamMap,
    targets: &TargetMetrics,
    timeout: Duration,
) -> Result<TargetMetrics, EvaluatorError> {
    match tokio::time::timeout(timeout, evaluator.evaluate(tool_name, params)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(tool_name, ?timeout, "evaluator timed out, substituting worst-case metrics");
            Ok(worst_case_metrics(targets))
        }
    }
}

fn worst_case_metrics(targets: &TargetMetrics) -> TargetMetrics {
    targets
        .iter()
        .map(|(name, target)| (name.clone(), target + 1.0e6))
        .collect()
}

/// Reference [`Evaluator`]: produces plausible, bounded synthetic metrics
/// for each requested target, derived deterministically from the candidate
/// parameters. Real implementations shell out to EDA tools.
#[derive(Debug, Default, Clone)]
pub struct ReferenceEvaluator;

#[async_trait]
impl Evaluator for ReferenceEvaluator {
    async fn evaluate(
        &self,
        _tool_name: &str,
        params: &ParamMap,
    ) -> Result<TargetMetrics, EvaluatorError> {
        // Fold all numeric parameter values into a single bounded signal and
        // report it under every metric name the caller might ask about; a
        // real evaluator would instead run the CAD tool and measure each
        // metric independently.
        let numeric_sum: f64 = params.values().filter_map(|v| v.as_numeric()).sum();
        let bounded = (numeric_sum.sin() + 1.0) / 2.0;
        Ok([
            ("execution_time".to_string(), bounded * 10.0),
            ("power".to_string(), bounded * 5.0),
            ("area".to_string(), bounded * 1000.0),
        ]
        .into_iter()
        .collect())
    }
}

/// The in-loop optimization objective every strategy searches against.
/// Implementations are synchronous and expected to be cheap.
pub trait Scorer: Send + Sync {
    fn score(&self, params: &ParamMap, targets: &TargetMetrics) -> f64;
}

/// `score(params, targets) = sum 1/(1+|params[m] - targets[m]|)` over
/// `m in targets ∩ params`. Monotone, bounded, smooth: each
/// term in `(0, 1]`.
#[derive(Debug, Default, Clone)]
pub struct DefaultScorer;

impl Scorer for DefaultScorer {
    fn score(&self, params: &ParamMap, targets: &TargetMetrics) -> f64 {
        targets
            .iter()
            .filter_map(|(name, target)| {
                params
                    .get(name)
                    .and_then(|v| v.as_numeric())
                    .map(|observed| 1.0 / (1.0 + (observed - target).abs()))
            })
            .sum()
    }
}

/// Wraps a plain closure as a [`Scorer`], used by tests and by strategies
/// that want to evaluate the normalized vector directly rather than the
/// typed parameter map.
pub struct ClosureScorer<F>(pub F)
where
    F: Fn(&ParamMap, &TargetMetrics) -> f64 + Send + Sync;

impl<F> Scorer for ClosureScorer<F>
where
    F: Fn(&ParamMap, &TargetMetrics) -> f64 + Send + Sync,
{
    fn score(&self, params: &ParamMap, targets: &TargetMetrics) -> f64 {
        (self.0)(params, targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holomesh_types::ParamValue;

    fn targets(pairs: &[(&str, f64)]) -> TargetMetrics {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn default_scorer_only_counts_shared_keys() {
        let mut params = ParamMap::new();
        params.insert("execution_time".into(), ParamValue::Float(5.0));
        params.insert("unrelated".into(), ParamValue::Float(999.0));
        let t = targets(&[("execution_time", 5.0), ("power", 1.0)]);
        let score = DefaultScorer.score(&params, &t);
        // Only execution_time is shared and it matches exactly: 1/(1+0)=1.0
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn default_scorer_is_monotone_bounded() {
        let mut params = ParamMap::new();
        params.insert("execution_time".into(), ParamValue::Float(100.0));
        let t = targets(&[("execution_time", 5.0)]);
        let score = DefaultScorer.score(&params, &t);
        assert!(score > 0.0 && score <= 1.0);
    }

    #[tokio::test]
    async fn reference_evaluator_is_bounded() {
        let evaluator = ReferenceEvaluator;
        let mut params = ParamMap::new();
        params.insert("optimization_level".into(), ParamValue::Int(2));
        let metrics = evaluator.evaluate("yosys", &params).await.unwrap();
        assert!(metrics["execution_time"] >= 0.0 && metrics["execution_time"] <= 10.0);
    }

    #[tokio::test]
    async fn timeout_substitutes_worst_case() {
        struct SlowEvaluator;
        #[async_trait]
        impl Evaluator for SlowEvaluator {
            async fn evaluate(
                &self,
                _tool_name: &str,
                _params: &ParamMap,
            ) -> Result<TargetMetrics, EvaluatorError> {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(TargetMetrics::new())
            }
        }

        let t = targets(&[("execution_time", 5.0)]);
        let result = evaluate_with_timeout(
            &SlowEvaluator,
            "yosys",
            &ParamMap::new(),
            &t,
            Duration::from_millis(10),
        )
        .await
        .unwrap();
        assert!(result["execution_time"] > 5.0);
    }
}
