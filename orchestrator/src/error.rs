//! Orchestrator-wide error type.
//!
//! Every subsystem error converts here via `#[from]`; the public entry
//! points never let one of these escape as a panic or raw `anyhow::Error` —
//! they're caught at the `optimize`/`get_recommendations` boundary and
//! turned into a structured result.

use crate::config::ConfigError;
use holomesh_cache::CacheError;
use holomesh_evaluator::EvaluatorError;
use holomesh_paramspace::ParamSpaceError;
use holomesh_queue::QueueError;
use holomesh_strategies::StrategyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error(transparent)]
    ParamSpace(#[from] ParamSpaceError),
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
