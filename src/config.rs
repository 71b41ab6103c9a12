//! Configuration handling.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest seed a TOML file can hold (TOML integers are signed 64-bit)
pub const MAX_SEED: u64 = i64::MAX as u64;

/// Pipeline configuration.
///
/// Every window length, the split fraction, the decision threshold and the
/// forest hyper-parameters live here. Missing keys in a TOML file fall back
/// to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Lookback of the volume rate of change
    pub momentum_window: usize,
    /// Fast EMA period of the convergence line
    pub fast_ema_period: usize,
    /// Slow EMA period of the convergence line
    pub slow_ema_period: usize,
    /// EMA period of the convergence signal
    pub signal_period: usize,
    /// High/low lookback of the stochastic oscillator
    pub stochastic_k_period: usize,
    /// SMA period used for %D and slow %D
    pub stochastic_d_period: usize,
    /// Number of records between a close and the close it is compared with
    pub label_horizon: usize,
    /// Share of each class placed in the training partition
    pub split_fraction: f64,
    /// Minimum Bullish probability for a Bullish prediction
    pub decision_threshold: f64,
    /// Seed for the split and the forest; `None` draws one from entropy.
    /// Written as an integer, or as `"entropy"` for `None`.
    #[serde(with = "seed_repr")]
    pub random_seed: Option<u64>,
    /// What to do with features that have no training variance
    pub degenerate_features: DegeneratePolicy,
    /// Forest parameters
    pub forest: ForestParams,
}

/// Handling of zero-variance features when fitting the scaler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Stop the run with `DegenerateFeature`
    Fail,
    /// Leave the feature unscaled and log a warning
    #[default]
    Identity,
}

/// Random forest hyper-parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForestParams {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features tried per split (sqrt of total if None)
    pub max_features: Option<usize>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            momentum_window: 7,
            fast_ema_period: 7,
            slow_ema_period: 30,
            signal_period: 9,
            stochastic_k_period: 14,
            stochastic_d_period: 3,
            label_horizon: 7,
            split_fraction: 0.67,
            decision_threshold: 0.6,
            random_seed: Some(42),
            degenerate_features: DegeneratePolicy::Identity,
            forest: ForestParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check ranges that the pipeline stages rely on.
    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("momentum_window", self.momentum_window),
            ("fast_ema_period", self.fast_ema_period),
            ("slow_ema_period", self.slow_ema_period),
            ("signal_period", self.signal_period),
            ("stochastic_k_period", self.stochastic_k_period),
            ("stochastic_d_period", self.stochastic_d_period),
            ("label_horizon", self.label_horizon),
            ("forest.n_trees", self.forest.n_trees),
            ("forest.max_depth", self.forest.max_depth),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{name} must be positive")));
            }
        }

        if !(self.split_fraction > 0.0 && self.split_fraction < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "split_fraction must be in (0, 1), got {}",
                self.split_fraction
            )));
        }

        if let Some(seed) = self.random_seed {
            if seed > MAX_SEED {
                return Err(Error::InvalidConfig(format!(
                    "random_seed must be at most {MAX_SEED}, got {seed}"
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(Error::InvalidConfig(format!(
                "decision_threshold must be in [0, 1], got {}",
                self.decision_threshold
            )));
        }

        Ok(())
    }

    /// Seed actually used for this run.
    ///
    /// Runs without a configured seed are not reproducible; the drawn seed is
    /// logged so a run can be repeated by pinning it. Drawn seeds stay within
    /// `MAX_SEED` so they can be written back to a config file.
    pub fn resolve_seed(&self) -> u64 {
        match self.random_seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random::<u64>() >> 1;
                tracing::warn!(seed, "No random_seed configured, drew one from entropy");
                seed
            }
        }
    }
}

/// `random_seed` as it appears in a config file
mod seed_repr {
    use serde::{Deserialize, Deserializer, Serializer};

    const ENTROPY: &str = "entropy";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Fixed(u64),
        Named(String),
    }

    pub fn serialize<S>(seed: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match seed {
            Some(seed) => serializer.serialize_u64(*seed),
            None => serializer.serialize_str(ENTROPY),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Fixed(seed) => Ok(Some(seed)),
            Repr::Named(name) if name.eq_ignore_ascii_case(ENTROPY) => Ok(None),
            Repr::Named(name) => Err(serde::de::Error::custom(format!(
                "random_seed must be an integer or \"{ENTROPY}\", got \"{name}\""
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.slow_ema_period, 30);
        assert_eq!(config.label_horizon, 7);
        assert_eq!(config.decision_threshold, 0.6);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            split_fraction = 0.5
            degenerate_features = "fail"
            [forest]
            n_trees = 12
            "#,
        )
        .unwrap();

        assert_eq!(config.split_fraction, 0.5);
        assert_eq!(config.degenerate_features, DegeneratePolicy::Fail);
        assert_eq!(config.forest.n_trees, 12);
        assert_eq!(config.forest.max_depth, 10);
        assert_eq!(config.momentum_window, 7);
    }

    #[test]
    fn test_rejects_bad_ranges() {
        let config = PipelineConfig {
            split_fraction: 1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = PipelineConfig {
            decision_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            signal_period: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");

        let config = PipelineConfig {
            random_seed: Some(7),
            decision_threshold: 0.55,
            ..Default::default()
        };
        config.to_file(&path).unwrap();

        let loaded = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unseeded_config_survives_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unseeded.toml");

        let config = PipelineConfig {
            random_seed: None,
            ..Default::default()
        };
        config.to_file(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains(r#"random_seed = "entropy""#));
        assert_eq!(PipelineConfig::from_file(&path).unwrap().random_seed, None);
    }

    #[test]
    fn test_missing_seed_key_uses_default_seed() {
        let config: PipelineConfig = toml::from_str("label_horizon = 5").unwrap();
        assert_eq!(config.random_seed, Some(42));

        assert!(toml::from_str::<PipelineConfig>(r#"random_seed = "sometimes""#).is_err());
    }

    #[test]
    fn test_largest_seed_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.toml");

        let config = PipelineConfig {
            random_seed: Some(MAX_SEED),
            ..Default::default()
        };
        config.to_file(&path).unwrap();
        assert_eq!(PipelineConfig::from_file(&path).unwrap().random_seed, Some(MAX_SEED));

        let too_big = PipelineConfig {
            random_seed: Some(MAX_SEED + 1),
            ..Default::default()
        };
        assert!(matches!(too_big.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_drawn_seed_can_be_pinned() {
        let config = PipelineConfig {
            random_seed: None,
            ..Default::default()
        };
        for _ in 0..64 {
            let seed = config.resolve_seed();
            let pinned = PipelineConfig {
                random_seed: Some(seed),
                ..Default::default()
            };
            assert!(pinned.validate().is_ok());
        }
    }
}
