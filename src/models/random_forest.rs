//! Random Forest implementation

use super::decision_tree::{DecisionTree, TreeConfig};
use crate::config::ForestParams;
use crate::data::{Dataset, FeatureRow};
use crate::error::{Error, Result};
use crate::features::{Label, N_FEATURES};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Random Forest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Max features per split (sqrt of total if None)
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed; tree `i` uses `seed + i`
    pub seed: u64,
    /// Out-of-bag score calculation
    pub oob_score: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            bootstrap: true,
            seed: 42,
            oob_score: true,
        }
    }
}

impl ForestConfig {
    pub fn from_params(params: &ForestParams, seed: u64) -> Self {
        Self {
            n_trees: params.n_trees,
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: params.max_features,
            seed,
            ..Default::default()
        }
    }
}

/// Shared flag that stops a running fit before the next tree starts
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
    oob_score_value: Option<f64>,
}

impl RandomForest {
    /// Create a new random forest
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            feature_importances: Vec::new(),
            oob_score_value: None,
        }
    }

    /// Train the random forest
    pub fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        self.fit_with_cancel(dataset, &CancelToken::new())
    }

    /// Train, checking `cancel` before each tree is built.
    ///
    /// Trees are built in parallel. Every tree reads the same immutable rows
    /// and owns its bootstrap sample, so the result does not depend on
    /// scheduling.
    pub fn fit_with_cancel(&mut self, dataset: &Dataset, cancel: &CancelToken) -> Result<()> {
        check_trainable(dataset)?;

        let rows = &dataset.rows;
        let n_samples = rows.len();

        // sqrt of the feature count for classification
        let max_features = self
            .config
            .max_features
            .unwrap_or_else(|| (N_FEATURES as f64).sqrt().ceil() as usize);

        info!(
            n_trees = self.config.n_trees,
            n_samples,
            seed = self.config.seed,
            "Training random forest"
        );

        let config = &self.config;
        let trees: Result<Vec<DecisionTree>> = (0..config.n_trees)
            .into_par_iter()
            .map(|i| {
                if cancel.is_cancelled() {
                    return Err(Error::Aborted);
                }

                let tree_seed = config.seed.wrapping_add(i as u64);
                let tree_config = TreeConfig {
                    max_depth: config.max_depth,
                    min_samples_split: config.min_samples_split,
                    min_samples_leaf: config.min_samples_leaf,
                    max_features: Some(max_features),
                    seed: tree_seed,
                };

                let indices = if config.bootstrap {
                    bootstrap_indices(n_samples, bootstrap_seed(tree_seed))
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = DecisionTree::new(tree_config);
                tree.fit(rows, &indices);
                Ok(tree)
            })
            .collect();

        self.trees = trees?;

        // Aggregate feature importances
        self.feature_importances = vec![0.0; N_FEATURES];
        for tree in &self.trees {
            for (i, &imp) in tree.feature_importances().iter().enumerate() {
                self.feature_importances[i] += imp;
            }
        }

        // Normalize
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }

        self.oob_score_value = if self.config.oob_score && self.config.bootstrap {
            self.calculate_oob_score(rows)
        } else {
            None
        };

        debug!(oob = ?self.oob_score_value, "Random forest trained");
        Ok(())
    }

    /// Out-of-bag accuracy at a 0.5 cut-off
    fn calculate_oob_score(&self, rows: &[FeatureRow]) -> Option<f64> {
        let n_samples = rows.len();
        let mut sums = vec![0.0; n_samples];
        let mut counts = vec![0usize; n_samples];

        for (tree_idx, tree) in self.trees.iter().enumerate() {
            let seed = bootstrap_seed(self.config.seed.wrapping_add(tree_idx as u64));
            let mut in_bag = vec![false; n_samples];
            for i in bootstrap_indices(n_samples, seed) {
                in_bag[i] = true;
            }

            for (i, row) in rows.iter().enumerate() {
                if !in_bag[i] {
                    sums[i] += tree.predict_proba_one(&row.features);
                    counts[i] += 1;
                }
            }
        }

        let mut correct = 0usize;
        let mut total = 0usize;
        for (i, row) in rows.iter().enumerate() {
            if counts[i] > 0 {
                let predicted = Label::from_positive(sums[i] / counts[i] as f64 >= 0.5);
                if predicted == row.label {
                    correct += 1;
                }
                total += 1;
            }
        }

        (total > 0).then(|| correct as f64 / total as f64)
    }

    /// Mean Bullish probability across trees
    pub fn predict_proba_one(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }

        let sum: f64 = self.trees.iter().map(|t| t.predict_proba_one(features)).sum();
        sum / self.trees.len() as f64
    }

    /// Predict probabilities for every row
    pub fn predict_proba(&self, dataset: &Dataset) -> Vec<f64> {
        dataset
            .rows
            .par_iter()
            .map(|r| self.predict_proba_one(&r.features))
            .collect()
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Get OOB score
    pub fn oob_score(&self) -> Option<f64> {
        self.oob_score_value
    }

    /// Number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}

const BOOTSTRAP_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Reject partitions a classifier cannot learn from
fn check_trainable(dataset: &Dataset) -> Result<()> {
    let counts = dataset.class_counts();
    if counts.total() == 0 {
        return Err(Error::EmptyPartition {
            partition: "training",
        });
    }
    if counts.bullish == 0 || counts.bearish == 0 {
        let class = if counts.bullish > 0 {
            Label::Bullish
        } else {
            Label::Bearish
        };
        return Err(Error::SingleClass {
            partition: "training",
            class: class.to_string(),
            rows: counts.total(),
        });
    }
    Ok(())
}

/// Seed of a tree's bootstrap sample, kept apart from the seed of its
/// per-node feature draws
fn bootstrap_seed(tree_seed: u64) -> u64 {
    tree_seed ^ BOOTSTRAP_SALT
}

/// Sample `n` indices with replacement
fn bootstrap_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}
