//! # Direction ML - Price Direction Forecasting
//!
//! Forecasts whether a daily close will be higher a fixed number of trading
//! days later. Technical indicators computed from the price history are fed
//! to a Random Forest classifier whose Bullish probability is thresholded and
//! evaluated on a held-out, stratified test partition.
//!
//! ## Modules
//!
//! - `data` - Daily price series, gap repair and labelled feature datasets
//! - `features` - Indicators, direction labels and window trimming
//! - `preprocessing` - Standardization fitted on the training partition
//! - `models` - Decision Tree and Random Forest classifiers
//! - `metrics` - Confusion matrix, ROC curve and evaluation report
//! - `pipeline` - End-to-end batch run from records to report

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod preprocessing;

pub use config::PipelineConfig;
pub use data::{Dataset, PriceSeries};
pub use error::{Error, Result};
pub use features::{IndicatorEngine, Label};
pub use models::{RandomForest, TrainedClassifier};
pub use pipeline::{Pipeline, PipelineOutput};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{DegeneratePolicy, ForestParams, PipelineConfig};
    pub use crate::data::{read_csv, Bar, Dataset, ObservationRecord, PriceSeries, Split};
    pub use crate::error::{Error, Result};
    pub use crate::features::{Feature, FeatureSchema, IndicatorEngine, Label};
    pub use crate::metrics::{ConfusionMatrix, EvaluationReport, RocCurve};
    pub use crate::models::{CancelToken, ForestConfig, RandomForest, TrainedClassifier};
    pub use crate::pipeline::{Pipeline, PipelineOutput};
    pub use crate::preprocessing::ScalingParameters;
}
