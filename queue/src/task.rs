//! Task record.

use chrono::{DateTime, Utc};
use holomesh_types::{ParamMap, TaskStatus};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static TASK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `tool_name + "_" + millisecond_timestamp + "_" + last-4-of-project_id`,
/// with a per-process counter appended: a millisecond timestamp alone can
/// collide under burst load, so the counter guarantees uniqueness within a
/// process even when two tasks land in the same millisecond.
pub fn generate_task_id(tool_name: &str, project_id: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let counter = TASK_COUNTER.fetch_add(1, Ordering::Relaxed);
    let suffix = last_n_chars(project_id, 4);
    format!("{tool_name}_{millis}_{suffix}_{counter}")
}

fn last_n_chars(s: &str, n: usize) -> &str {
    let char_count = s.chars().count();
    if char_count <= n {
        s
    } else {
        let skip = char_count - n;
        let byte_offset = s.char_indices().nth(skip).map(|(i, _)| i).unwrap_or(0);
        &s[byte_offset..]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub tool_name: String,
    pub params: ParamMap,
    pub project_id: String,
    pub priority: i64,
    pub created_at: DateTime<Utc>,
    pub status: TaskStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl Task {
    pub fn new(tool_name: String, params: ParamMap, project_id: String, priority: i64) -> Self {
        Self {
            task_id: generate_task_id(&tool_name, &project_id),
            tool_name,
            params,
            project_id,
            priority,
            created_at: Utc::now(),
            status: TaskStatus::Pending,
            result: None,
            error: None,
        }
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            task_id: self.task_id.clone(),
            tool_name: self.tool_name.clone(),
            project_id: self.project_id.clone(),
            priority: self.priority,
            created_at: self.created_at,
            status: self.status,
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}

/// Read-only view returned by `status`/`list` — never exposes the live task
/// record, only a point-in-time copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub tool_name: String,
    pub project_id: String,
    pub priority: i64,
    pub created_at: DateTime<Utc>,
    pub status: TaskStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_are_unique_under_burst() {
        let ids: Vec<String> = (0..100).map(|_| generate_task_id("yosys", "proj_1234")).collect();
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn task_id_suffix_is_last_four_of_project() {
        let id = generate_task_id("yosys", "project_abcd");
        assert!(id.contains("abcd"));
    }

    #[test]
    fn short_project_id_is_used_whole() {
        let id = generate_task_id("yosys", "ab");
        assert!(id.starts_with("yosys_"));
        assert!(id.contains("_ab_"));
    }
}
