//! Optimization strategies: Bayesian, Advanced Bayesian, Transfer
//! Learning, Ensemble, Semi-Automatic, and Manual. Every strategy shares the
//! `run(tool_name, initial_params, targets, process_id, budget) -> params`
//! signature and publishes progress via the bus at initiation, per
//! iteration, on best-so-far updates, and on completion.

pub mod advanced_bayesian;
pub mod bayesian;
pub mod collaborators;
mod common;
pub mod confidence;
pub mod ensemble;
pub mod manual;
pub mod semi_automatic;
pub mod transfer;

pub use collaborators::{HoloMeshRecommender, NoopHoloMeshRecommender, NoopToolGuidanceProvider, ToolGuidanceProvider};
pub use confidence::confidence_score;

use holomesh_paramspace::ParamSpaceError;
use holomesh_types::{ParamMap, ParameterDescriptor, TargetMetrics};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("strategy requires at least one parameter descriptor")]
    NoDescriptors,
    #[error(transparent)]
    ParamSpace(#[from] ParamSpaceError),
}

pub type StrategyResult<T> = Result<T, StrategyError>;

/// Everything a strategy needs to run one optimization, independent of which
/// concrete strategy is chosen.
#[derive(Debug, Clone)]
pub struct StrategyInput<'a> {
    pub tool_name: &'a str,
    pub project_id: &'a str,
    pub task_id: &'a str,
    pub initial_params: ParamMap,
    pub targets: TargetMetrics,
    pub budget: usize,
    pub descriptors: Vec<ParameterDescriptor>,
}

impl<'a> StrategyInput<'a> {
    pub fn with_budget(&self, budget: usize) -> Self {
        Self {
            tool_name: self.tool_name,
            project_id: self.project_id,
            task_id: self.task_id,
            initial_params: self.initial_params.clone(),
            targets: self.targets.clone(),
            budget,
            descriptors: self.descriptors.clone(),
        }
    }

    pub fn with_initial_params(&self, initial_params: ParamMap) -> Self {
        Self {
            tool_name: self.tool_name,
            project_id: self.project_id,
            task_id: self.task_id,
            initial_params,
            targets: self.targets.clone(),
            budget: self.budget,
            descriptors: self.descriptors.clone(),
        }
    }
}

/// The parameters a strategy settled on, plus the bookkeeping the
/// orchestrator needs to report `iterations` and compute `confidence_score`.
#[derive(Debug, Clone)]
pub struct StrategyOutput {
    pub params: ParamMap,
    pub iterations: usize,
    pub best_score: f64,
}

pub(crate) fn ensure_descriptors(descriptors: &[ParameterDescriptor]) -> StrategyResult<()> {
    if descriptors.is_empty() {
        Err(StrategyError::NoDescriptors)
    } else {
        Ok(())
    }
}
