//! Trained direction classifier bound to a feature schema

use super::random_forest::{CancelToken, ForestConfig, RandomForest};
use crate::data::Dataset;
use crate::error::Result;
use crate::features::{FeatureSchema, Label};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Decision threshold used when the caller does not pick one
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// A fitted forest together with the feature layout it was trained on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedClassifier {
    schema: FeatureSchema,
    forest: RandomForest,
}

impl TrainedClassifier {
    /// Fit a forest on the (scaled) training partition
    pub fn fit(train: &Dataset, config: ForestConfig) -> Result<Self> {
        Self::fit_with_cancel(train, config, &CancelToken::new())
    }

    pub fn fit_with_cancel(
        train: &Dataset,
        config: ForestConfig,
        cancel: &CancelToken,
    ) -> Result<Self> {
        let mut forest = RandomForest::new(config);
        forest.fit_with_cancel(train, cancel)?;
        Ok(Self {
            schema: train.schema.clone(),
            forest,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Probability that the vector belongs to the Bullish class, in [0, 1]
    pub fn predict_probability(&self, features: &[f64]) -> Result<f64> {
        self.schema.ensure_width(features.len())?;
        Ok(self.forest.predict_proba_one(features))
    }

    /// Bullish iff the probability reaches `threshold`
    pub fn predict_class(&self, features: &[f64], threshold: f64) -> Result<Label> {
        let probability = self.predict_probability(features)?;
        Ok(Label::from_positive(probability >= threshold))
    }

    /// Probabilities for every row of a dataset with the same schema
    pub fn predict_dataset(&self, data: &Dataset) -> Result<Vec<f64>> {
        self.schema.ensure_matches(&data.schema)?;
        Ok(self.forest.predict_proba(data))
    }

    /// Feature names paired with importances, most important first
    pub fn feature_importance_ranking(&self) -> Vec<(&'static str, f64)> {
        let mut ranking: Vec<(&'static str, f64)> = self
            .schema
            .features
            .iter()
            .map(|f| f.name())
            .zip(self.forest.feature_importances().iter().copied())
            .collect();

        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranking
    }

    /// Save model to JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Load model from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
