//! Parameter descriptors: name, kind, bounds.

use serde::{Deserialize, Serialize};

/// The four parameter kinds the original chip-flow configuration declares.
/// Continuous and integer parameters carry `[min, max]`; boolean normalizes
/// to `[0, 1]`; categorical carries an ordered option list addressed by
/// index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterKind {
    ContinuousReal { min: f64, max: f64 },
    Integer { min: i64, max: i64 },
    Boolean,
    Categorical { options: Vec<String> },
}

impl ParameterKind {
    /// Linear bounds used by normalize/denormalize. Categorical bounds are
    /// expressed over the option index range.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            ParameterKind::ContinuousReal { min, max } => (*min, *max),
            ParameterKind::Integer { min, max } => (*min as f64, *max as f64),
            ParameterKind::Boolean => (0.0, 1.0),
            ParameterKind::Categorical { options } => {
                (0.0, (options.len().saturating_sub(1)) as f64)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub kind: ParameterKind,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn continuous(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self::new(name, ParameterKind::ContinuousReal { min, max })
    }

    pub fn integer(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self::new(name, ParameterKind::Integer { min, max })
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Boolean)
    }

    pub fn categorical(name: impl Into<String>, options: Vec<String>) -> Self {
        Self::new(name, ParameterKind::Categorical { options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorical_bounds_span_the_option_index_range() {
        let options = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let kind = ParameterKind::Categorical { options };
        assert_eq!(kind.bounds(), (0.0, 2.0));
    }

    #[test]
    fn single_option_categorical_has_zero_width_bounds() {
        let kind = ParameterKind::Categorical { options: vec!["only".to_string()] };
        assert_eq!(kind.bounds(), (0.0, 0.0));
    }

    #[test]
    fn boolean_bounds_are_unit_interval() {
        assert_eq!(ParameterKind::Boolean.bounds(), (0.0, 1.0));
    }
}
