//! Error types for the forecasting pipeline

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// A column starts with a missing value, so there is nothing to carry forward
    #[error("Missing {field} on {date} with no earlier observation to carry forward")]
    MissingLeadingValue { field: &'static str, date: NaiveDate },

    /// Two records share the same date
    #[error("Duplicate date in series: {0}")]
    DuplicateDate(NaiveDate),

    /// Series is not strictly ascending by date
    #[error("Series is not date-ordered: {previous} is followed by {next}")]
    UnorderedDates { previous: NaiveDate, next: NaiveDate },

    /// Volume cannot enter a logarithmic ratio
    #[error("Non-positive volume {volume} on {date}")]
    NonPositiveVolume { date: NaiveDate, volume: f64 },

    /// Feature has zero variance on the training partition
    #[error("Feature '{feature}' has zero variance on the training partition")]
    DegenerateFeature { feature: String },

    /// A partition handed to a fitting step has no rows
    #[error("The {partition} partition is empty")]
    EmptyPartition { partition: &'static str },

    /// A partition handed to the classifier holds a single class
    #[error("The {partition} partition contains only {class} rows ({rows} rows)")]
    SingleClass {
        partition: &'static str,
        class: String,
        rows: usize,
    },

    /// Training was cancelled
    #[error("Classifier training aborted")]
    Aborted,

    /// Feature vector layout does not match the fitted schema
    #[error("Feature schema mismatch: expected {expected}, got {actual}")]
    SchemaMismatch { expected: String, actual: String },

    /// Parallel inputs of different lengths
    #[error("Length mismatch: {what} has {actual} entries, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data parsing error
    #[error("Failed to parse data: {0}")]
    Parse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}
