//! Configuration types for the streaming clustering pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised when a configuration is inconsistent.
///
/// All of these are fatal at configuration time: the engine refuses to
/// process any point with an invalid parameter set rather than letting the
/// inconsistency surface later as a numeric error.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be at least 1, got {value}")]
    BelowOne { name: &'static str, value: usize },

    #[error(
        "beta * mu must exceed 1 (got beta={beta}, mu={mu}): the decay period \
         formula takes log(beta*mu / (beta*mu - 1))"
    )]
    DecayBound { beta: f64, mu: f64 },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration for the DenStream micro-cluster maintenance engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DenStreamConfig {
    /// Decay rate for time-weighted statistics.
    #[serde(default = "default_lambda")]
    pub lambda: f64,

    /// Merge radius: a point joins a cluster only if the cluster's radius
    /// after the insertion stays within this bound.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Minimum neighborhood size for density seeding and macro grouping.
    #[serde(default = "default_min_points")]
    pub min_points: usize,

    /// Core-cluster weight scale.
    #[serde(default = "default_mu")]
    pub mu: f64,

    /// Potential-cluster weight fraction: clusters survive pruning while
    /// their decayed weight stays at or above `beta * mu`.
    #[serde(default = "default_beta")]
    pub beta: f64,

    /// Number of points buffered before the initial seeding pass runs.
    #[serde(default = "default_init_points")]
    pub init_points: usize,

    /// Grouping radius for offline extraction, as a multiple of epsilon.
    #[serde(default = "default_offline_multiplier")]
    pub offline_multiplier: f64,

    /// Number of processed points per logical time unit.
    #[serde(default = "default_processing_speed")]
    pub processing_speed: usize,
}

fn default_lambda() -> f64 {
    0.25
}

fn default_epsilon() -> f64 {
    0.02
}

fn default_min_points() -> usize {
    1
}

fn default_mu() -> f64 {
    1.0
}

fn default_beta() -> f64 {
    0.2
}

fn default_init_points() -> usize {
    1000
}

fn default_offline_multiplier() -> f64 {
    2.0
}

fn default_processing_speed() -> usize {
    100
}

impl Default for DenStreamConfig {
    fn default() -> Self {
        Self {
            lambda: default_lambda(),
            epsilon: default_epsilon(),
            min_points: default_min_points(),
            mu: default_mu(),
            beta: default_beta(),
            init_points: default_init_points(),
            offline_multiplier: default_offline_multiplier(),
            processing_speed: default_processing_speed(),
        }
    }
}

impl DenStreamConfig {
    /// Check every parameter bound.
    ///
    /// Note that the default values (`beta = 0.2`, `mu = 1`) do not satisfy
    /// the `beta * mu > 1` bound and are rejected here; callers must pick a
    /// weight scale under which the decay period is defined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("lambda", self.lambda),
            ("epsilon", self.epsilon),
            ("mu", self.mu),
            ("beta", self.beta),
            ("offline_multiplier", self.offline_multiplier),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }

        for (name, value) in [
            ("min_points", self.min_points),
            ("init_points", self.init_points),
            ("processing_speed", self.processing_speed),
        ] {
            if value < 1 {
                return Err(ConfigError::BelowOne { name, value });
            }
        }

        if self.beta * self.mu <= 1.0 {
            return Err(ConfigError::DecayBound {
                beta: self.beta,
                mu: self.mu,
            });
        }

        Ok(())
    }

    /// Decay period `tp`: the number of time units after which an outlier
    /// cluster with no further insertions is guaranteed to have decayed
    /// below its survival bound, plus one.
    ///
    /// Only defined for validated configurations (`beta * mu > 1`).
    pub fn decay_period(&self) -> Result<u64, ConfigError> {
        self.validate()?;
        let bm = self.beta * self.mu;
        let tp = (1.0 / self.lambda * (bm / (bm - 1.0)).ln()).round() as u64 + 1;
        Ok(tp)
    }

    /// Weight bound below which a potential cluster is pruned.
    #[inline]
    pub fn weight_bound(&self) -> f64 {
        self.beta * self.mu
    }
}

/// Configuration for reading the input point stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamConfig {
    /// Force header handling on input CSVs. `None` sniffs the first row.
    #[serde(default)]
    pub has_headers: Option<bool>,

    /// Maximum number of points to ingest (0 = unbounded).
    #[serde(default)]
    pub max_points: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            has_headers: None,
            max_points: 0,
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(default)]
    pub denstream: DenStreamConfig,

    #[serde(default)]
    pub stream: StreamConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_denstream_config() {
        let config = DenStreamConfig::default();
        assert_eq!(config.lambda, 0.25);
        assert_eq!(config.epsilon, 0.02);
        assert_eq!(config.min_points, 1);
        assert_eq!(config.init_points, 1000);
        assert_eq!(config.processing_speed, 100);
    }

    #[test]
    fn test_default_config_fails_decay_bound() {
        // beta=0.2, mu=1 gives beta*mu = 0.2 <= 1
        let config = DenStreamConfig::default();
        match config.validate() {
            Err(ConfigError::DecayBound { beta, mu }) => {
                assert_eq!(beta, 0.2);
                assert_eq!(mu, 1.0);
            }
            other => panic!("expected DecayBound error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_decay_period_positive_for_valid_bounds() {
        let config = DenStreamConfig {
            beta: 0.25,
            mu: 8.0,
            ..DenStreamConfig::default()
        };
        // 1/0.25 * ln(2/1) = 2.77 -> rounds to 3 -> +1
        assert_eq!(config.decay_period().unwrap(), 4);

        let config = DenStreamConfig {
            lambda: 0.5,
            beta: 0.5,
            mu: 10.0,
            ..DenStreamConfig::default()
        };
        let tp = config.decay_period().unwrap();
        assert!(tp >= 1);
    }

    #[test]
    fn test_decay_period_fails_closed_at_bound() {
        // beta*mu exactly 1 must also be rejected
        let config = DenStreamConfig {
            beta: 0.5,
            mu: 2.0,
            ..DenStreamConfig::default()
        };
        assert!(config.decay_period().is_err());
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        let config = DenStreamConfig {
            lambda: 0.0,
            ..DenStreamConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { name: "lambda", .. })
        ));

        let config = DenStreamConfig {
            epsilon: f64::NAN,
            ..DenStreamConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DenStreamConfig {
            processing_speed: 0,
            ..DenStreamConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BelowOne {
                name: "processing_speed",
                ..
            })
        ));
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");

        let mut config = PipelineConfig::default();
        config.denstream.mu = 12.0;
        config.denstream.epsilon = 0.5;
        config.stream.max_points = 5000;

        config.to_yaml(&path).unwrap();
        let loaded = PipelineConfig::from_yaml(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.yaml");
        std::fs::write(&path, "denstream:\n  mu: 9.0\n").unwrap();

        let loaded = PipelineConfig::from_yaml(&path).unwrap();
        assert_eq!(loaded.denstream.mu, 9.0);
        assert_eq!(loaded.denstream.lambda, 0.25);
        assert_eq!(loaded.stream.max_points, 0);
    }
}
