//! Configuration schema, loaded by layering sources: compiled-in defaults,
//! then an optional file, then `HOLOMESH_`-prefixed environment overrides.

use holomesh_types::{InteractionMode, ParamMap, ParameterDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),
    #[error("failed to serialize built-in defaults: {0}")]
    Defaults(#[from] serde_json::Error),
}

/// `holomesh.interaction_modes.{mode}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionModeConfig {
    pub description: String,
    pub default_confidentiality: bool,
    pub holomesh_integration: bool,
}

/// `holomesh.recommendations.confidence_scoring.{source}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceScoringEntry {
    pub base_score: f64,
    pub bonus: f64,
}

/// `holomesh.recommendations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsConfig {
    pub similarity_threshold: f64,
    pub max_recommendations: usize,
    pub confidence_scoring: BTreeMap<String, ConfidenceScoringEntry>,
}

/// `holomesh.performance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    pub cache_ttl_hours: u64,
}

/// `tools.{tool}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    pub supported_modes: Vec<InteractionMode>,
    pub default_parameters: ParamMap,
    pub parameter_ranges: Vec<ParameterDescriptor>,
    pub optimization_profiles: Vec<OptimizationProfile>,
}

/// One cold-start transfer-learning seed record, used to pre-populate the
/// similarity database from known-good configurations before any live
/// project has been recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationProfile {
    pub project_id: String,
    pub context: ParamMap,
    pub optimal_config: ParamMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub interaction_modes: BTreeMap<String, InteractionModeConfig>,
    pub recommendations: RecommendationsConfig,
    pub performance: PerformanceConfig,
    pub tools: BTreeMap<String, ToolConfig>,
}

impl RuntimeConfig {
    /// Layers compiled-in defaults, an optional `HOLOMESH_CONFIG_FILE` TOML
    /// file, then `HOLOMESH__section__key`-style environment overrides, via
    /// the `config` crate.
    pub fn from_env_and_defaults() -> Result<Self, ConfigError> {
        let defaults_json = serde_json::to_string(&Self::default())?;
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(&defaults_json, config::FileFormat::Json));
        if let Ok(path) = std::env::var("HOLOMESH_CONFIG_FILE") {
            builder = builder.add_source(config::File::with_name(&path).required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("HOLOMESH").separator("__"));
        Ok(builder.build()?.try_deserialize()?)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let mut interaction_modes = BTreeMap::new();
        interaction_modes.insert(
            "professional".to_string(),
            InteractionModeConfig {
                description: "Fully automated optimization".to_string(),
                default_confidentiality: false,
                holomesh_integration: false,
            },
        );
        interaction_modes.insert(
            "innovative".to_string(),
            InteractionModeConfig {
                description: "Ensemble-driven exploratory optimization".to_string(),
                default_confidentiality: false,
                holomesh_integration: true,
            },
        );
        interaction_modes.insert(
            "semi_automatic".to_string(),
            InteractionModeConfig {
                description: "HoloMesh-assisted optimization with operator review".to_string(),
                default_confidentiality: false,
                holomesh_integration: true,
            },
        );
        interaction_modes.insert(
            "manual".to_string(),
            InteractionModeConfig {
                description: "Operator-directed configuration".to_string(),
                default_confidentiality: true,
                holomesh_integration: false,
            },
        );

        let mut confidence_scoring = BTreeMap::new();
        confidence_scoring.insert(
            "default_parameters".to_string(),
            ConfidenceScoringEntry { base_score: 0.75, bonus: 0.05 },
        );
        confidence_scoring.insert(
            "similarity_match".to_string(),
            ConfidenceScoringEntry { base_score: 0.6, bonus: 0.35 },
        );

        let mut tools = BTreeMap::new();
        tools.insert(
            "yosys".to_string(),
            ToolConfig {
                supported_modes: vec![InteractionMode::Professional, InteractionMode::Manual],
                default_parameters: [
                    ("optimization_level".to_string(), holomesh_types::ParamValue::Int(1)),
                    ("clock_period".to_string(), holomesh_types::ParamValue::Float(5.0)),
                ]
                .into_iter()
                .collect(),
                parameter_ranges: vec![
                    ParameterDescriptor::integer("optimization_level", 0, 3),
                    ParameterDescriptor::continuous("clock_period", 1.0, 10.0),
                    ParameterDescriptor::boolean("retiming"),
                ],
                optimization_profiles: Vec::new(),
            },
        );
        tools.insert(
            "nextpnr".to_string(),
            ToolConfig {
                supported_modes: vec![
                    InteractionMode::Professional,
                    InteractionMode::Innovative,
                    InteractionMode::SemiAutomatic,
                    InteractionMode::Manual,
                ],
                default_parameters: [(
                    "placer_effort".to_string(),
                    holomesh_types::ParamValue::Float(0.5),
                )]
                .into_iter()
                .collect(),
                parameter_ranges: vec![ParameterDescriptor::continuous("placer_effort", 0.0, 1.0)],
                optimization_profiles: Vec::new(),
            },
        );

        Self {
            interaction_modes,
            recommendations: RecommendationsConfig {
                similarity_threshold: 0.7,
                max_recommendations: 5,
                confidence_scoring,
            },
            performance: PerformanceConfig { cache_ttl_hours: 24 },
            tools,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_env_loader() {
        let config = RuntimeConfig::from_env_and_defaults().unwrap();
        assert!(config.tools.contains_key("yosys"));
        assert_eq!(config.recommendations.max_recommendations, 5);
    }

    #[test]
    fn yosys_supports_only_professional_and_manual() {
        let config = RuntimeConfig::default();
        let yosys = &config.tools["yosys"];
        assert!(yosys.supported_modes.contains(&InteractionMode::Professional));
        assert!(!yosys.supported_modes.contains(&InteractionMode::Innovative));
    }
}
