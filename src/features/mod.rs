//! Feature engineering module
//!
//! Provides technical indicators, direction labels and the trimming step
//! that turns an indicator-annotated series into feature rows.

mod engine;
pub mod indicators;
mod labels;
mod rows;
mod schema;

pub use engine::{IndicatorEngine, IndicatorParams, IndicatorSet};
pub use labels::{label_closes, Label};
pub use rows::{trim_to_rows, TrimSummary};
pub use schema::{Feature, FeatureSchema, N_FEATURES};
