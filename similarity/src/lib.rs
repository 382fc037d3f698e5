//! In-memory project similarity database.
//!
//! Guarded by a single `RwLock` for the whole table: reads (finding similar
//! projects) are common, writes (recording a new project's outcome) are
//! rare.

use holomesh_types::{ParamMap, TargetMetrics};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

/// A past project's recorded context and (if it completed) its optimal
/// configuration, keyed by `project_id` in the database.
#[derive(Debug, Clone, Default)]
pub struct ProjectRecord {
    pub project_id: String,
    pub tool_name: String,
    pub context: ParamMap,
    pub optimal_config: Option<ParamMap>,
    pub performance_metrics: TargetMetrics,
}

/// Similarity over two context maps: `|equal-valued common keys| / |common
/// keys|`. Zero when either side has no context or there are
/// no shared keys.
pub fn context_similarity(a: &ParamMap, b: &ParamMap) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let common: Vec<&String> = a.keys().filter(|k| b.contains_key(*k)).collect();
    if common.is_empty() {
        return 0.0;
    }
    let matches = common.iter().filter(|k| a.get(**k) == b.get(**k)).count();
    matches as f64 / common.len() as f64
}

#[derive(Debug, Clone)]
pub struct SimilarProject {
    pub record: ProjectRecord,
    pub similarity: f64,
}

/// In-memory `project_id -> ProjectRecord` table.
#[derive(Default)]
pub struct ProjectDb {
    records: RwLock<BTreeMap<String, ProjectRecord>>,
}

impl ProjectDb {
    pub fn new() -> Self {
        Self { records: RwLock::new(BTreeMap::new()) }
    }

    /// Seeds the database from cold-start records drawn from a tool's
    /// configured `optimization_profiles`: a fresh process otherwise has no
    /// transfer-learning peers to draw on until real optimizations complete.
    pub fn with_seed_records(records: Vec<ProjectRecord>) -> Self {
        let db = Self::new();
        {
            let mut table = db.records.write();
            for record in records {
                table.insert(record.project_id.clone(), record);
            }
        }
        db
    }

    pub fn upsert(&self, record: ProjectRecord) {
        self.records.write().insert(record.project_id.clone(), record);
    }

    pub fn get(&self, project_id: &str) -> Option<ProjectRecord> {
        self.records.read().get(project_id).cloned()
    }

    /// Number of stored records, used by confidentiality tests to assert a
    /// confidential run left the database untouched.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Peers of the same `tool_name` (excluding `project_id` itself) whose
    /// context similarity to `project_id`'s own context is `>= threshold`,
    /// sorted descending, capped at `max_recommendations`.
    pub fn find_similar(
        &self,
        project_id: &str,
        tool_name: &str,
        threshold: f64,
        max_recommendations: usize,
    ) -> Vec<SimilarProject> {
        let table = self.records.read();
        let anchor_context = match table.get(project_id) {
            Some(record) => record.context.clone(),
            None => return Vec::new(),
        };
        self.rank_peers(&table, project_id, tool_name, &anchor_context, threshold, max_recommendations)
    }

    /// Same ranking, anchored on an ad-hoc context rather than a stored
    /// project. Used by `GetRecommendations` when the caller
    /// has no project id of its own yet.
    pub fn recommend(
        &self,
        tool_name: &str,
        context: &ParamMap,
        threshold: f64,
        max_recommendations: usize,
    ) -> Vec<SimilarProject> {
        let table = self.records.read();
        self.rank_peers(&table, "__ad_hoc_current_project__", tool_name, context, threshold, max_recommendations)
    }

    fn rank_peers(
        &self,
        table: &BTreeMap<String, ProjectRecord>,
        exclude_project_id: &str,
        tool_name: &str,
        anchor_context: &ParamMap,
        threshold: f64,
        max_recommendations: usize,
    ) -> Vec<SimilarProject> {
        let mut ranked: Vec<SimilarProject> = table
            .values()
            .filter(|record| record.project_id != exclude_project_id && record.tool_name == tool_name)
            .filter_map(|record| {
                let similarity = context_similarity(anchor_context, &record.context);
                (similarity >= threshold).then(|| SimilarProject { record: record.clone(), similarity })
            })
            .collect();
        ranked.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap());
        ranked.truncate(max_recommendations);
        debug!(tool_name, found = ranked.len(), "ranked similar projects");
        ranked
    }
}
