//! Z-score feature scaling fitted on the training partition

use crate::data::{Dataset, FeatureRow};
use crate::error::{Error, Result};
use crate::features::{FeatureSchema, N_FEATURES};
use ndarray::{Array1, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Standard deviations at or below this are treated as zero
const MIN_STD: f64 = 1e-12;

/// Per-feature mean and standard deviation.
///
/// Fields are private: once fitted the parameters cannot change, and the
/// same values scale every partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredParameters")]
pub struct ScalingParameters {
    schema: FeatureSchema,
    mean: Array1<f64>,
    std: Array1<f64>,
}

/// Unchecked form read from disk
#[derive(Deserialize)]
struct StoredParameters {
    schema: FeatureSchema,
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl TryFrom<StoredParameters> for ScalingParameters {
    type Error = Error;

    fn try_from(stored: StoredParameters) -> Result<Self> {
        Self::from_parts(stored.schema, stored.mean, stored.std)
    }
}

impl ScalingParameters {
    /// Build parameters from stored values.
    ///
    /// Needs one mean and one positive standard deviation per feature of a
    /// `N_FEATURES`-wide schema.
    pub fn from_parts(schema: FeatureSchema, mean: Array1<f64>, std: Array1<f64>) -> Result<Self> {
        schema.ensure_width(N_FEATURES)?;
        for (what, values) in [("mean", &mean), ("std", &std)] {
            if values.len() != schema.len() {
                return Err(Error::LengthMismatch {
                    what,
                    expected: schema.len(),
                    actual: values.len(),
                });
            }
        }
        if let Some(j) = std.iter().position(|&s| !(s > MIN_STD && s.is_finite())) {
            return Err(Error::DegenerateFeature {
                feature: schema.features[j].name().to_string(),
            });
        }

        Ok(Self { schema, mean, std })
    }

    /// Fit on the training partition.
    ///
    /// Fails with `DegenerateFeature` for the first feature whose training
    /// standard deviation is zero.
    pub fn fit(train: &Dataset) -> Result<Self> {
        let params = Self::fit_raw(train)?;
        if let Some(j) = params.std.iter().position(|&s| s <= MIN_STD) {
            return Err(Error::DegenerateFeature {
                feature: train.schema.features[j].name().to_string(),
            });
        }
        Ok(params)
    }

    /// Fit, giving zero-variance features an identity scale.
    ///
    /// Returns the names of the features that were left unscaled so the
    /// caller can decide whether to keep them.
    pub fn fit_lenient(train: &Dataset) -> Result<(Self, Vec<String>)> {
        let mut params = Self::fit_raw(train)?;
        let mut degenerate = Vec::new();

        for (j, std) in params.std.iter_mut().enumerate() {
            if *std <= MIN_STD {
                let name = train.schema.features[j].name();
                warn!(feature = name, "Zero training variance, leaving feature unscaled");
                degenerate.push(name.to_string());
                *std = 1.0;
                params.mean[j] = 0.0;
            }
        }

        Ok((params, degenerate))
    }

    fn fit_raw(train: &Dataset) -> Result<Self> {
        if train.is_empty() {
            return Err(Error::EmptyPartition {
                partition: "training",
            });
        }

        let x = train.features_array();
        let mean = x
            .mean_axis(Axis(0))
            .ok_or(Error::EmptyPartition {
                partition: "training",
            })?;
        let std = x.std_axis(Axis(0), 0.0);

        Ok(Self {
            schema: train.schema.clone(),
            mean,
            std,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn std(&self) -> &Array1<f64> {
        &self.std
    }

    /// Scale a single feature vector
    pub fn transform_vector(&self, features: &[f64; N_FEATURES]) -> [f64; N_FEATURES] {
        let mut out = *features;
        for (j, value) in out.iter_mut().enumerate() {
            *value = (*value - self.mean[j]) / self.std[j];
        }
        out
    }

    /// Scale a partition; labels, dates and order are unchanged
    pub fn transform(&self, data: &Dataset) -> Result<Dataset> {
        self.schema.ensure_matches(&data.schema)?;

        let rows = data
            .rows
            .iter()
            .map(|row| FeatureRow {
                features: self.transform_vector(&row.features),
                ..*row
            })
            .collect();

        Ok(Dataset::from_rows(data.schema.clone(), rows))
    }
}
