//! Parameter Space.
//!
//! Exposes a registry of parameter descriptors per CAD tool plus the
//! normalize/denormalize/random-sample operations that let every kernel and
//! acquisition function share one `[0,1]^d` vector space regardless of the
//! underlying parameter's real type.

use holomesh_types::{ParamMap, ParamValue, ParameterDescriptor, ParameterKind};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParamSpaceError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("vector length {got} does not match descriptor count {expected}")]
    VectorLengthMismatch { expected: usize, got: usize },
}

pub type ParamSpaceResult<T> = Result<T, ParamSpaceError>;

/// Registry of parameter descriptors keyed by tool name. Populated at
/// startup from the `tools.*.parameter_ranges` configuration section (spec
/// §6); the orchestrator owns one instance and hands out references.
#[derive(Debug, Clone, Default)]
pub struct ParamSpace {
    tools: BTreeMap<String, Vec<ParameterDescriptor>>,
}

impl ParamSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool_name: impl Into<String>, descriptors: Vec<ParameterDescriptor>) {
        self.tools.insert(tool_name.into(), descriptors);
    }

    pub fn descriptors_for(&self, tool_name: &str) -> ParamSpaceResult<&[ParameterDescriptor]> {
        self.tools
            .get(tool_name)
            .map(Vec::as_slice)
            .ok_or_else(|| ParamSpaceError::UnknownTool(tool_name.to_string()))
    }

    pub fn known_tools(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }
}

/// Normalize a typed parameter map into a dense `[0,1]^d` vector, one entry
/// per descriptor in descriptor order. Parameters absent from `params` (but
/// present in `descriptors`) fall back to the midpoint of their range — this
/// only affects the surrogate vector, never the returned payload.
pub fn normalize(params: &ParamMap, descriptors: &[ParameterDescriptor]) -> Vec<f64> {
    descriptors
        .iter()
        .map(|d| match params.get(&d.name) {
            Some(value) => normalize_one(value, &d.kind),
            None => 0.5,
        })
        .collect()
}

fn normalize_one(value: &ParamValue, kind: &ParameterKind) -> f64 {
    let normalized = match kind {
        ParameterKind::ContinuousReal { min, max } => {
            let v = value.as_numeric().unwrap_or(*min);
            linear_normalize(v, *min, *max)
        }
        ParameterKind::Integer { min, max } => {
            let v = value.as_numeric().unwrap_or(*min as f64);
            linear_normalize(v, *min as f64, *max as f64)
        }
        ParameterKind::Boolean => match value {
            ParamValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            other => {
                if other.as_numeric().unwrap_or(0.0) >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        },
        ParameterKind::Categorical { options } => {
            let idx = match value {
                ParamValue::String(s) => {
                    options.iter().position(|o| o == s).unwrap_or(0) as f64
                }
                other => other.as_numeric().unwrap_or(0.0),
            };
            let max_idx = options.len().saturating_sub(1) as f64;
            linear_normalize(idx, 0.0, max_idx)
        }
    };
    normalized.clamp(0.0, 1.0)
}

fn linear_normalize(value: f64, min: f64, max: f64) -> f64 {
    if (max - min).abs() < f64::EPSILON {
        0.0
    } else {
        (value - min) / (max - min)
    }
}

/// Denormalize a `[0,1]^d` vector back into a typed parameter map.
/// `template` supplies the identity-passthrough values for parameters that
/// are not covered by `descriptors`.
pub fn denormalize(
    vector: &[f64],
    descriptors: &[ParameterDescriptor],
    template: &ParamMap,
) -> ParamSpaceResult<ParamMap> {
    if vector.len() != descriptors.len() {
        return Err(ParamSpaceError::VectorLengthMismatch {
            expected: descriptors.len(),
            got: vector.len(),
        });
    }

    let mut out = template.clone();
    for (d, &v) in descriptors.iter().zip(vector.iter()) {
        out.insert(d.name.clone(), denormalize_one(v, &d.kind));
    }
    Ok(out)
}

fn denormalize_one(v: f64, kind: &ParameterKind) -> ParamValue {
    let v = v.clamp(0.0, 1.0);
    match kind {
        ParameterKind::ContinuousReal { min, max } => {
            ParamValue::Float((min + v * (max - min)).clamp(*min, *max))
        }
        ParameterKind::Integer { min, max } => {
            let raw = *min as f64 + v * (*max as f64 - *min as f64);
            let rounded = raw.round() as i64;
            ParamValue::Int(rounded.clamp(*min, *max))
        }
        ParameterKind::Boolean => ParamValue::Bool(v >= 0.5),
        ParameterKind::Categorical { options } => {
            if options.is_empty() {
                return ParamValue::String(String::new());
            }
            let max_idx = (options.len() - 1) as f64;
            let idx = (v * max_idx).round().clamp(0.0, max_idx) as usize;
            ParamValue::String(options[idx].clone())
        }
    }
}

/// Draw a uniformly random, fully-typed parameter configuration from the
/// descriptor set. Used to seed the initial exploration phase of every
/// Bayesian-family strategy.
pub fn random_sample(descriptors: &[ParameterDescriptor]) -> ParamMap {
    let mut rng = rand::thread_rng();
    let vector: Vec<f64> = descriptors
        .iter()
        .map(|_| rand::Rng::gen_range(&mut rng, 0.0..=1.0))
        .collect();
    denormalize(&vector, descriptors, &ParamMap::new())
        .expect("vector length matches descriptors by construction")
}
