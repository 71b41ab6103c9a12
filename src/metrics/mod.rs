//! Evaluation metrics module

mod classification;

pub use classification::{ConfusionMatrix, EvaluationReport, RocCurve, RocPoint, RocPoints};
