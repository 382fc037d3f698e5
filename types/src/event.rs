//! Progress events published by strategies and consumed by the progress bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Severity classification attached to failure progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// One ordered update on a running task's stage, progress fraction, and
/// message. `seq` is a per-process monotonic counter assigned at
/// publication time; it is what actually guarantees total order within a
/// task when two events land in the same clock tick, `timestamp` is the
/// wall-clock value reported to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub task_id: String,
    pub tool_name: String,
    pub project_id: String,
    pub stage: String,
    pub progress: f64,
    pub message: String,
    pub metrics: Option<BTreeMap<String, f64>>,
    pub severity: Option<Severity>,
    pub timestamp: DateTime<Utc>,
    pub seq: u64,
}

impl ProgressEvent {
    /// Synthetic `{stage: "connected", progress: 0}` event replayed to a
    /// fresh subscriber when no event has been published for the task yet.
    pub fn connected(task_id: impl Into<String>, seq: u64) -> Self {
        Self {
            task_id: task_id.into(),
            tool_name: String::new(),
            project_id: String::new(),
            stage: "connected".to_string(),
            progress: 0.0,
            message: "subscribed".to_string(),
            metrics: None,
            severity: None,
            timestamp: Utc::now(),
            seq,
        }
    }

    /// The process-wide broadcast channel's task id, used by
    /// `broadcast_system`.
    pub const SYSTEM_TASK_ID: &'static str = "__system__";
}
