//! Data structures and preprocessing module
//!
//! Provides the repaired price series and the feature-row dataset.

mod dataset;
pub mod series;

pub use dataset::{ClassCounts, Dataset, FeatureRow, Split};
pub use series::{read_csv, Bar, ObservationRecord, PriceSeries};
