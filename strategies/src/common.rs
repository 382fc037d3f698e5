//! Shared helpers used by every strategy: progress publication, parameter
//! blending, hash-driven adaptation, and perturbation.

use crate::StrategyInput;
use holomesh_progress::ProgressBus;
use holomesh_types::{ParamMap, ParamValue, ProgressEvent, Severity};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

pub fn emit(
    progress: &ProgressBus,
    input: &StrategyInput<'_>,
    stage: &str,
    fraction: f64,
    message: impl Into<String>,
    metrics: Option<BTreeMap<String, f64>>,
) {
    progress.publish(ProgressEvent {
        task_id: input.task_id.to_string(),
        tool_name: input.tool_name.to_string(),
        project_id: input.project_id.to_string(),
        stage: stage.to_string(),
        progress: fraction.clamp(0.0, 1.0),
        message: message.into(),
        metrics,
        severity: Some(Severity::Info),
        timestamp: chrono::Utc::now(),
        seq: 0,
    });
}

/// Blends every key present in both maps as `current*w_current +
/// other*w_other` when both values are numeric; keys only in `current` are
/// kept unchanged; non-numeric overlaps adopt `other`'s value verbatim.
pub fn blend_params(current: &ParamMap, other: &ParamMap, w_current: f64, w_other: f64) -> ParamMap {
    let mut out = current.clone();
    for (key, other_value) in other {
        if let Some(current_value) = current.get(key) {
            out.insert(key.clone(), blend_value(current_value, other_value, w_current, w_other));
        }
    }
    out
}

fn blend_value(current: &ParamValue, other: &ParamValue, w_current: f64, w_other: f64) -> ParamValue {
    match (current.is_numeric(), other.is_numeric()) {
        (true, true) => ParamValue::Float(
            current.as_numeric().unwrap_or(0.0) * w_current + other.as_numeric().unwrap_or(0.0) * w_other,
        ),
        _ => other.clone(),
    }
}

/// Per-key arithmetic mean over numeric values, first-seen for non-numeric.
pub fn combine_configs(configs: &[ParamMap]) -> ParamMap {
    let mut keys: BTreeSet<String> = BTreeSet::new();
    for c in configs {
        keys.extend(c.keys().cloned());
    }
    let mut out = ParamMap::new();
    for key in keys {
        let values: Vec<&ParamValue> = configs.iter().filter_map(|c| c.get(&key)).collect();
        if values.iter().all(|v| v.is_numeric()) && !values.is_empty() {
            let mean = values.iter().filter_map(|v| v.as_numeric()).sum::<f64>() / values.len() as f64;
            out.insert(key, ParamValue::Float(mean));
        } else if let Some(first) = values.first() {
            out.insert(key, (*first).clone());
        }
    }
    out
}

/// Weighted mean over numeric values (weights normalized internally), first
/// result's value for non-numeric keys.
pub fn weighted_combine_configs(configs: &[ParamMap], weights: &[f64]) -> ParamMap {
    if configs.is_empty() {
        return ParamMap::new();
    }
    let total: f64 = weights.iter().sum();
    let norm: Vec<f64> = if total > 0.0 {
        weights.iter().map(|w| w / total).collect()
    } else {
        vec![1.0 / weights.len() as f64; weights.len()]
    };

    let mut keys: BTreeSet<String> = BTreeSet::new();
    for c in configs {
        keys.extend(c.keys().cloned());
    }
    let mut out = ParamMap::new();
    for key in keys {
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        for (config, w) in configs.iter().zip(norm.iter()) {
            if let Some(v) = config.get(&key).filter(|v| v.is_numeric()) {
                weighted_sum += v.as_numeric().unwrap_or(0.0) * w;
                weight_sum += w;
            }
        }
        if weight_sum > 0.0 {
            out.insert(key.clone(), ParamValue::Float(weighted_sum / weight_sum));
        } else if let Some(v) = configs[0].get(&key) {
            out.insert(key.clone(), v.clone());
        }
    }
    out
}

/// FNV-1a over the project id, stable across runs (unlike a randomized
/// process-wide hasher), so the adaptation scale is reproducible for a given
/// project.
fn stable_hash(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in s.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// `value * (1 + (hash(project_id) % 1000 / 1000 - 0.5) * 0.2)` applied to
/// every numeric field; non-numeric fields pass through unchanged.
pub fn hash_adapt(params: &ParamMap, project_id: &str) -> ParamMap {
    let h = stable_hash(project_id);
    let scale = 1.0 + ((h % 1000) as f64 / 1000.0 - 0.5) * 0.2;
    params
        .iter()
        .map(|(k, v)| {
            let adapted = match v.as_numeric() {
                Some(n) if v.is_numeric() => ParamValue::Float(n * scale),
                _ => v.clone(),
            };
            (k.clone(), adapted)
        })
        .collect()
}

fn gaussian_noise(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Jitters every numeric field by `+/- fraction` of its own magnitude using a
/// Gaussian sample, with no re-evaluation or reselection.
pub fn perturb_numeric(params: &ParamMap, fraction: f64) -> ParamMap {
    let mut rng = rand::thread_rng();
    params
        .iter()
        .map(|(k, v)| {
            let perturbed = match v.as_numeric() {
                Some(n) if v.is_numeric() => {
                    let noise = gaussian_noise(&mut rng) * fraction * n;
                    ParamValue::Float(n + noise)
                }
                _ => v.clone(),
            };
            (k.clone(), perturbed)
        })
        .collect()
}
