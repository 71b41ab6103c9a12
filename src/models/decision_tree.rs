//! Decision Tree implementation

use crate::data::FeatureRow;
use crate::features::N_FEATURES;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum depth of tree
    pub max_depth: usize,
    /// Minimum samples required to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf node
    pub min_samples_leaf: usize,
    /// Maximum features to consider for split (None = all)
    pub max_features: Option<usize>,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            seed: 42,
        }
    }
}

/// Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    /// Feature index and threshold; `None` for leaves
    pub split: Option<(usize, f64)>,
    /// Share of Bullish samples reaching this node
    pub probability: f64,
    /// Number of samples in this node
    pub n_samples: usize,
    /// Left child (feature <= threshold)
    pub left: Option<Box<TreeNode>>,
    /// Right child
    pub right: Option<Box<TreeNode>>,
    /// Gini impurity at this node
    pub impurity: f64,
}

impl TreeNode {
    fn leaf(probability: f64, n_samples: usize, impurity: f64) -> Self {
        Self {
            split: None,
            probability,
            n_samples,
            left: None,
            right: None,
            impurity,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub fn depth(&self) -> usize {
        let left = self.left.as_ref().map(|n| n.depth()).unwrap_or(0);
        let right = self.right.as_ref().map(|n| n.depth()).unwrap_or(0);
        1 + left.max(right)
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
    gain: f64,
}

/// Binary classification tree over feature rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    config: TreeConfig,
    root: Option<TreeNode>,
    feature_importances: Vec<f64>,
}

impl DecisionTree {
    /// Create a new decision tree with config
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: None,
            feature_importances: Vec::new(),
        }
    }

    /// Train on `rows[i]` for every `i` in `indices`; repeated indices act
    /// as sample weights.
    pub fn fit(&mut self, rows: &[FeatureRow], indices: &[usize]) {
        self.feature_importances = vec![0.0; N_FEATURES];
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        self.root = Some(self.build_tree(rows, indices, 0, &mut rng));

        // Normalize feature importances
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
    }

    /// Build tree recursively
    fn build_tree(
        &mut self,
        rows: &[FeatureRow],
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n = indices.len();
        let positives = count_positive(rows, indices);
        let impurity = gini(positives, n);
        let probability = if n == 0 { 0.5 } else { positives as f64 / n as f64 };

        if depth >= self.config.max_depth
            || n < self.config.min_samples_split
            || impurity < 1e-10
        {
            return TreeNode::leaf(probability, n, impurity);
        }

        let Some(best) = self.find_best_split(rows, indices, impurity, rng) else {
            return TreeNode::leaf(probability, n, impurity);
        };

        self.feature_importances[best.feature] += best.gain * n as f64;

        let left = self.build_tree(rows, &best.left, depth + 1, rng);
        let right = self.build_tree(rows, &best.right, depth + 1, rng);

        TreeNode {
            split: Some((best.feature, best.threshold)),
            probability,
            n_samples: n,
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
            impurity,
        }
    }

    /// Best Gini split over a random subset of features.
    ///
    /// Each candidate feature is sorted once and swept left to right with
    /// running class counts; thresholds are midpoints between distinct values.
    fn find_best_split(
        &self,
        rows: &[FeatureRow],
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let max_features = self.config.max_features.unwrap_or(N_FEATURES).clamp(1, N_FEATURES);
        let min_leaf = self.config.min_samples_leaf.max(1);

        let mut feature_indices: Vec<usize> = (0..N_FEATURES).collect();
        feature_indices.shuffle(rng);
        feature_indices.truncate(max_features);

        let n = indices.len();
        let total_pos = count_positive(rows, indices);
        let mut best: Option<(usize, f64, f64)> = None;

        for &feature in &feature_indices {
            let mut sorted: Vec<(f64, bool)> = indices
                .iter()
                .map(|&i| (rows[i].features[feature], rows[i].label.is_positive()))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_pos = 0usize;
            for k in 0..n - 1 {
                if sorted[k].1 {
                    left_pos += 1;
                }
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf || sorted[k].0 == sorted[k + 1].0 {
                    continue;
                }

                let weighted = (n_left as f64 * gini(left_pos, n_left)
                    + n_right as f64 * gini(total_pos - left_pos, n_right))
                    / n as f64;
                let gain = parent_impurity - weighted;

                if gain > best.map(|(_, _, g)| g).unwrap_or(0.0) {
                    let threshold = (sorted[k].0 + sorted[k + 1].0) / 2.0;
                    best = Some((feature, threshold, gain));
                }
            }
        }

        let (feature, threshold, gain) = best?;
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| rows[i].features[feature] <= threshold);

        Some(BestSplit {
            feature,
            threshold,
            left,
            right,
            gain,
        })
    }

    /// Probability of the Bullish class for one feature vector
    pub fn predict_proba_one(&self, features: &[f64]) -> f64 {
        let Some(mut node) = self.root.as_ref() else {
            return 0.5;
        };

        loop {
            match (node.split, node.left.as_deref(), node.right.as_deref()) {
                (Some((feature, threshold)), Some(left), Some(right)) => {
                    node = if features[feature] <= threshold { left } else { right };
                }
                _ => return node.probability,
            }
        }
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    pub fn depth(&self) -> usize {
        self.root.as_ref().map(|r| r.depth()).unwrap_or(0)
    }
}

fn count_positive(rows: &[FeatureRow], indices: &[usize]) -> usize {
    indices.iter().filter(|&&i| rows[i].label.is_positive()).count()
}

fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Label;
    use chrono::{Duration, NaiveDate};

    fn threshold_rows(n: usize) -> Vec<FeatureRow> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                let x = i as f64 / 10.0;
                let mut features = [0.0; N_FEATURES];
                features[2] = x;
                features[4] = (i % 7) as f64;
                FeatureRow {
                    date: start + Duration::days(i as i64),
                    close: 1.0,
                    features,
                    label: Label::from_positive(x > 5.0),
                }
            })
            .collect()
    }

    #[test]
    fn test_decision_tree_classification() {
        let rows = threshold_rows(100);
        let indices: Vec<usize> = (0..rows.len()).collect();

        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&rows, &indices);

        let correct = rows
            .iter()
            .filter(|r| Label::from_positive(tree.predict_proba_one(&r.features) >= 0.5) == r.label)
            .count();
        assert!(correct as f64 / rows.len() as f64 > 0.9);

        let root = tree.root().unwrap();
        assert!(!root.is_leaf());
        let (feature, threshold) = root.split.unwrap();
        assert_eq!(feature, 2);
        assert!((threshold - 5.05).abs() < 1e-9);
        assert!(tree.feature_importances()[2] > 0.99);
    }

    #[test]
    fn test_pure_node_is_a_leaf() {
        let rows: Vec<FeatureRow> = threshold_rows(40).into_iter().take(20).collect();
        let indices: Vec<usize> = (0..rows.len()).collect();

        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&rows, &indices);

        assert_eq!(tree.depth(), 1);
        assert!(tree.root().unwrap().is_leaf());
        assert_eq!(tree.predict_proba_one(&[0.0; N_FEATURES]), 0.0);
    }

    #[test]
    fn test_same_seed_same_tree() {
        let rows = threshold_rows(60);
        let indices: Vec<usize> = (0..rows.len()).collect();
        let config = TreeConfig {
            max_features: Some(2),
            seed: 9,
            ..Default::default()
        };

        let mut a = DecisionTree::new(config.clone());
        let mut b = DecisionTree::new(config);
        a.fit(&rows, &indices);
        b.fit(&rows, &indices);

        for row in &rows {
            assert_eq!(a.predict_proba_one(&row.features), b.predict_proba_one(&row.features));
        }
    }
}
