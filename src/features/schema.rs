//! Ordered feature vector layout shared by the scaler, classifier and evaluator

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of predictors in a feature row
pub const N_FEATURES: usize = 6;

/// Indicator features fed to the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Log rate of change of volume
    Momentum,
    /// Fast EMA minus slow EMA of close
    ConvergenceLine,
    /// EMA of the convergence line
    ConvergenceSignal,
    /// Stochastic %K
    FastK,
    /// Stochastic %D
    FastD,
    /// Stochastic slow %D
    SlowD,
}

impl Feature {
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Momentum => "momentum",
            Feature::ConvergenceLine => "convergence_line",
            Feature::ConvergenceSignal => "convergence_signal",
            Feature::FastK => "fast_k",
            Feature::FastD => "fast_d",
            Feature::SlowD => "slow_d",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Versioned, ordered list of features.
///
/// Position `i` of every feature vector holds `features[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub features: Vec<Feature>,
}

impl FeatureSchema {
    /// The six indicator features in their canonical order
    pub fn v1() -> Self {
        Self {
            version: 1,
            features: vec![
                Feature::Momentum,
                Feature::ConvergenceLine,
                Feature::ConvergenceSignal,
                Feature::FastK,
                Feature::FastD,
                Feature::SlowD,
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.features.iter().map(|f| f.name()).collect()
    }

    pub fn index_of(&self, feature: Feature) -> Option<usize> {
        self.features.iter().position(|&f| f == feature)
    }

    /// Fail unless `other` describes the same layout.
    pub fn ensure_matches(&self, other: &FeatureSchema) -> Result<()> {
        if self == other {
            Ok(())
        } else {
            Err(Error::SchemaMismatch {
                expected: self.to_string(),
                actual: other.to_string(),
            })
        }
    }

    /// Fail unless a vector has one value per feature.
    pub fn ensure_width(&self, width: usize) -> Result<()> {
        if width == self.len() {
            Ok(())
        } else {
            Err(Error::SchemaMismatch {
                expected: format!("{} values ({})", self.len(), self),
                actual: format!("{width} values"),
            })
        }
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::v1()
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}[{}]", self.version, self.names().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_layout() {
        let schema = FeatureSchema::v1();
        assert_eq!(schema.len(), N_FEATURES);
        assert_eq!(schema.index_of(Feature::Momentum), Some(0));
        assert_eq!(schema.index_of(Feature::SlowD), Some(5));
        assert_eq!(schema.to_string(), "v1[momentum, convergence_line, convergence_signal, fast_k, fast_d, slow_d]");
    }

    #[test]
    fn test_mismatch_is_reported() {
        let schema = FeatureSchema::v1();
        let mut reordered = FeatureSchema::v1();
        reordered.features.swap(0, 1);

        assert!(schema.ensure_matches(&FeatureSchema::v1()).is_ok());
        assert!(matches!(
            schema.ensure_matches(&reordered),
            Err(Error::SchemaMismatch { .. })
        ));
        assert!(schema.ensure_width(5).is_err());
    }
}
