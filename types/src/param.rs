//! Dynamic parameter values and maps.
//!
//! Parameters arrive as a dynamically-typed map; we represent that as a
//! tagged sum type over the four value kinds the parameter space actually
//! handles.

use std::collections::BTreeMap;
use std::fmt;

/// A single parameter value. Surrogates only ever see `f64` vectors; this
/// type is the boundary representation returned to callers.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

/// A parameter configuration: name -> typed value. Immutable once produced
/// by a strategy step.
pub type ParamMap = BTreeMap<String, ParamValue>;

impl ParamValue {
    /// Best-effort coercion to `f64`, used when a strategy blends numeric
    /// fields (transfer learning, ensemble, semi-automatic/manual blends).
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            ParamValue::String(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, ParamValue::String(_))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::String(v) => write!(f, "{v}"),
        }
    }
}

/// Canonical JSON form used by the fingerprinting layer: keys sorted,
/// compact separators, matching the original `json.dumps(..., sort_keys=True,
/// separators=(',', ':'))` behavior. `BTreeMap` already iterates in sorted
/// key order, and `serde_json` preserves map insertion/iteration order for
/// `BTreeMap`, so a plain `to_string` is already canonical here.
pub fn canonical_json(params: &ParamMap) -> String {
    serde_json::to_string(params).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_json_is_order_independent() {
        let mut a = ParamMap::new();
        a.insert("b".into(), ParamValue::Int(2));
        a.insert("a".into(), ParamValue::Int(1));

        let mut b = ParamMap::new();
        b.insert("a".into(), ParamValue::Int(1));
        b.insert("b".into(), ParamValue::Int(2));

        assert_eq!(canonical_json(&a), canonical_json(&b));
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(ParamValue::Int(3).as_numeric(), Some(3.0));
        assert_eq!(ParamValue::Bool(true).as_numeric(), Some(1.0));
        assert_eq!(ParamValue::String("x".into()).as_numeric(), None);
    }
}
