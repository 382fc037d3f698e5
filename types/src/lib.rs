//! Shared value types for the HoloMesh CAD parameter optimizer.
//!
//! Every other crate in the workspace builds on the types defined here:
//! the dynamic parameter map, parameter descriptors, samples accumulated by
//! a strategy, target metrics, and the handful of small value objects that
//! cross crate boundaries (progress events, interaction modes, ...).

pub mod descriptor;
pub mod event;
pub mod param;

pub use descriptor::{ParameterDescriptor, ParameterKind};
pub use event::{ProgressEvent, Severity};
pub use param::{ParamMap, ParamValue};

use std::collections::BTreeMap;

/// Target metrics requested by a caller: metric name -> desired value.
///
/// A `BTreeMap` keeps iteration order stable, which matters both for
/// deterministic fingerprinting and for reproducible scoring sums.
pub type TargetMetrics = BTreeMap<String, f64>;

/// One observed (normalized-vector, fitness) pair accumulated during a
/// strategy run. Append-only within a single optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub vector: Vec<f64>,
    pub fitness: f64,
}

impl Sample {
    pub fn new(vector: Vec<f64>, fitness: f64) -> Self {
        Self { vector, fitness }
    }
}

/// The operator-facing label selecting strategy flavor and external
/// collaborator usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    Professional,
    Innovative,
    SemiAutomatic,
    Manual,
}

impl InteractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionMode::Professional => "professional",
            InteractionMode::Innovative => "innovative",
            InteractionMode::SemiAutomatic => "semi_automatic",
            InteractionMode::Manual => "manual",
        }
    }
}

impl std::fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strategies a caller may select. A `Genetic` variant was considered and
/// dropped: we keep the set out entirely rather than ship a strategy with
/// no behavior behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Bayesian,
    AdvancedBayesian,
    TransferLearning,
    Ensemble,
    SemiAutomatic,
    Manual,
}

/// Terminal and non-terminal states a task can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_failed_and_cancelled_are_terminal() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn interaction_mode_displays_as_snake_case() {
        assert_eq!(InteractionMode::SemiAutomatic.to_string(), "semi_automatic");
        assert_eq!(InteractionMode::Professional.to_string(), "professional");
    }
}
