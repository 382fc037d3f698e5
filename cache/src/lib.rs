//! Fingerprint-keyed result cache.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use holomesh_types::{ParamMap, ParamValue, TargetMetrics};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache key is empty")]
    EmptyKey,
}

pub type CacheResult<T> = Result<T, CacheError>;

/// `(fingerprint -> { optimized_params, final_metrics, created_at })`
///. `last_access` and the TTL deadline live in
/// [`StoredEntry`] alongside it, not on the value itself — callers only see
/// the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub optimized_params: ParamMap,
    pub final_metrics: TargetMetrics,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredEntry {
    entry: CacheEntry,
    tool_name: String,
    project_id: String,
    ttl: Duration,
    last_access: DateTime<Utc>,
    access_seq: u64,
}

impl StoredEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(self.last_access);
        match elapsed.to_std() {
            Ok(elapsed) => elapsed > self.ttl,
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CacheStats {
    pub cache_enabled: bool,
    pub default_ttl_seconds: u64,
    pub cache_prefix: String,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub active_entries: usize,
}

/// Computes the stable fingerprint over `(tool_name, canonical-json(params))`
///. The key format embeds `tool_name`
/// as a literal prefix segment so that `invalidate(tool_name)`'s pattern
/// delete can match on it directly, while the hash itself still
/// covers the full parameter payload for uniqueness.
pub fn fingerprint(cache_prefix: &str, tool_name: &str, params: &ParamMap) -> String {
    let canonical = holomesh_types::param::canonical_json(params);
    let mut hasher = Sha256::new();
    hasher.update(tool_name.as_bytes());
    hasher.update(b"|");
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    format!("{cache_prefix}{tool_name}:{}", hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// First 8 characters of `project_id`, char-boundary safe. Used wherever the
/// source truncates a project id for a cache key (`project_id[:8]`).
pub fn truncate_project_id(project_id: &str) -> &str {
    match project_id.char_indices().nth(8) {
        Some((byte_offset, _)) => &project_id[..byte_offset],
        None => project_id,
    }
}

/// The project-scoped cache key used by the orchestrator's `Optimize` cache
/// lookup and by single-key `invalidate`. Recomputed from a synthetic
/// `{"project_id": ...}` map rather than the entry's real parameters, so a
/// lookup only needs to know the tool and project, not the exact parameters
/// that produced the cached entry.
pub fn scoped_key(cache_prefix: &str, tool_name: &str, project_id: &str) -> String {
    let mut synthetic = ParamMap::new();
    synthetic.insert(
        "project_id".to_string(),
        ParamValue::String(truncate_project_id(project_id).to_string()),
    );
    fingerprint(cache_prefix, tool_name, &synthetic)
}

/// Result cache: fingerprint -> artifact, bounded by `max_cache_size` with
/// LRU eviction, sliding-window TTL, and pattern invalidation.
pub struct ResultCache {
    prefix: String,
    default_ttl: Duration,
    max_size: usize,
    entries: DashMap<String, StoredEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    access_counter: AtomicU64,
}

impl ResultCache {
    pub fn new(prefix: impl Into<String>, default_ttl: Duration, max_size: usize) -> Self {
        Self {
            prefix: prefix.into(),
            default_ttl,
            max_size,
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            access_counter: AtomicU64::new(0),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// On hit, touches the TTL (sliding-window reset) and returns a clone
    /// of the stored artifact. On miss, returns `None`.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let now = Utc::now();
        match self.entries.get_mut(key) {
            Some(mut stored) if !stored.is_expired(now) => {
                stored.last_access = now;
                stored.access_seq = self.access_counter.fetch_add(1, Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(stored.entry.clone())
            }
            Some(_) => {
                drop(self.entries.remove(key));
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(
        &self,
        key: impl Into<String>,
        tool_name: impl Into<String>,
        project_id: impl Into<String>,
        entry: CacheEntry,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }
        let now = Utc::now();
        self.entries.insert(
            key,
            StoredEntry {
                entry,
                tool_name: tool_name.into(),
                project_id: project_id.into(),
                ttl: ttl.unwrap_or(self.default_ttl),
                last_access: now,
                access_seq: self.access_counter.fetch_add(1, Ordering::Relaxed),
            },
        );
        self.evict_if_over_capacity();
        Ok(())
    }

    /// Bounded LRU: on overflow, evicts the oldest 10 entries by
    /// `last_access`/`access_seq`.
    fn evict_if_over_capacity(&self) {
        if self.entries.len() <= self.max_size {
            return;
        }
        let mut by_age: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().access_seq))
            .collect();
        by_age.sort_by_key(|(_, seq)| *seq);
        let to_evict = by_age.into_iter().take(10);
        for (key, _) in to_evict {
            self.entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        debug!(size = self.entries.len(), "evicted oldest entries over capacity");
    }

    /// `(tool_name, project_id)`: delete one specific key, recomputing the
    /// fingerprint from a synthetic `{"project_id": ...}` map rather than
    /// the entry's real parameters, so a caller can invalidate by project
    /// without knowing the exact parameters that were cached.
    /// `tool_name` only: delete every key whose fingerprint prefix matches
    /// `cache_prefix||tool_name||":"`. Neither: flush everything.
    pub fn invalidate(&self, tool_name: Option<&str>, project_id: Option<&str>) -> usize {
        match (tool_name, project_id) {
            (Some(tool), Some(project)) => {
                let key = scoped_key(&self.prefix, tool, project);
                if self.entries.remove(&key).is_some() {
                    info!(tool, project, "invalidated single cache entry");
                    1
                } else {
                    0
                }
            }
            (Some(tool), None) => {
                let pattern = format!("{}{}:", self.prefix, tool);
                let keys: Vec<String> = self
                    .entries
                    .iter()
                    .filter(|e| e.key().starts_with(&pattern))
                    .map(|e| e.key().clone())
                    .collect();
                let count = keys.len();
                for key in keys {
                    self.entries.remove(&key);
                }
                info!(tool, count, "invalidated cache entries by tool pattern");
                count
            }
            (None, _) => {
                let count = self.entries.len();
                self.entries.clear();
                info!(count, "flushed entire cache");
                count
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cache_enabled: true,
            default_ttl_seconds: self.default_ttl.as_secs(),
            cache_prefix: self.prefix.clone(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            active_entries: self.entries.len(),
        }
    }

    /// Entries belonging to a given tool (diagnostic use, not in the RPC
    /// surface), used by the orchestrator when re-seeding after invalidation.
    pub fn entries_for_tool(&self, tool_name: &str) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter(|e| e.value().tool_name == tool_name)
            .map(|e| (e.key().clone(), e.value().project_id.clone()))
            .collect()
    }
}
