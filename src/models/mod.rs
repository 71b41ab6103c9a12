//! Machine learning models module
//!
//! Provides the classification tree, the Random Forest built from it and the
//! schema-bound classifier used by the pipeline.

mod classifier;
mod decision_tree;
pub mod random_forest;

pub use classifier::{TrainedClassifier, DEFAULT_THRESHOLD};
pub use decision_tree::{DecisionTree, TreeConfig, TreeNode};
pub use random_forest::{CancelToken, ForestConfig, RandomForest};
