use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::catalog::{CatalogOptions, UniversalScope};
use crate::error::ConfigError;
use crate::scheduler::ProbabilityMode;

/// Limits and switches for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Maximum number of top-level steps.
    pub max_steps: usize,

    /// Maximum depth of response chaining below a top-level beat.
    pub max_response_depth: usize,

    /// PRNG seed. `None` draws one from OS entropy.
    pub seed: Option<u64>,

    pub probability_mode: ProbabilityMode,

    /// Passed to the catalog when it is loaded through [`Self::catalog_options`].
    pub universal_scope: UniversalScope,

    /// Zero-argument fact that ends the run as `Closed`.
    pub closed_fact: String,

    /// Zero-argument fact that ends the run as `Briefed`.
    pub briefed_fact: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_steps: 500,
            max_response_depth: 8,
            seed: None,
            probability_mode: ProbabilityMode::Gate,
            universal_scope: UniversalScope::RuleRoles,
            closed_fact: "case is closed".to_string(),
            briefed_fact: "case is briefed".to_string(),
        }
    }
}

impl SimulationConfig {
    /// Load from a TOML file; missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            universal_scope: self.universal_scope,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_response_depth(mut self, depth: usize) -> Self {
        self.max_response_depth = depth;
        self
    }

    pub fn with_probability_mode(mut self, mode: ProbabilityMode) -> Self {
        self.probability_mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.max_steps, 500);
        assert_eq!(config.max_response_depth, 8);
        assert_eq!(config.seed, None);
        assert_eq!(config.probability_mode, ProbabilityMode::Gate);
        assert_eq!(config.catalog_options().universal_scope, UniversalScope::RuleRoles);
    }

    #[test]
    fn test_partial_toml() {
        let config = SimulationConfig::from_toml_str(
            r#"
max_steps = 50
seed = 1234
probability_mode = "weighted"
universal_scope = "world"
"#,
        )
        .unwrap();
        assert_eq!(config.max_steps, 50);
        assert_eq!(config.seed, Some(1234));
        assert_eq!(config.probability_mode, ProbabilityMode::Weighted);
        assert_eq!(config.universal_scope, UniversalScope::World);
        assert_eq!(config.max_response_depth, 8);
        assert_eq!(config.closed_fact, "case is closed");
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            SimulationConfig::from_toml_str("max_steps = \"many\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SimulationConfig::load("/no/such/config.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
