//! Dataset structure for machine learning

use crate::error::{Error, Result};
use crate::features::{FeatureSchema, Label, N_FEATURES};
use chrono::NaiveDate;
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

/// A record whose indicators and label are all defined
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub close: f64,
    /// Indicator values laid out per the dataset's schema
    pub features: [f64; N_FEATURES],
    pub label: Label,
}

/// Date-ordered feature rows sharing one schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub schema: FeatureSchema,
    pub rows: Vec<FeatureRow>,
}

/// Train/test split result
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

/// Row counts per class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub bullish: usize,
    pub bearish: usize,
}

impl ClassCounts {
    pub fn total(&self) -> usize {
        self.bullish + self.bearish
    }

    /// Share of Bullish rows, NaN when empty
    pub fn bullish_ratio(&self) -> f64 {
        self.bullish as f64 / self.total() as f64
    }
}

impl Dataset {
    /// Create a new empty dataset
    pub fn new(schema: FeatureSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(schema: FeatureSchema, rows: Vec<FeatureRow>) -> Self {
        Self { schema, rows }
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.schema.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.rows.iter().map(|r| r.label).collect()
    }

    pub fn class_counts(&self) -> ClassCounts {
        let bullish = self.rows.iter().filter(|r| r.label.is_positive()).count();
        ClassCounts {
            bullish,
            bearish: self.rows.len() - bullish,
        }
    }

    /// Get feature matrix as ndarray
    pub fn features_array(&self) -> Array2<f64> {
        let n_samples = self.n_samples();
        let n_features = self.n_features();

        if n_samples == 0 {
            return Array2::zeros((0, n_features));
        }

        Array2::from_shape_fn((n_samples, n_features), |(i, j)| self.rows[i].features[j])
    }

    /// Positive-class indicator per row
    pub fn targets_array(&self) -> Array1<f64> {
        self.rows.iter().map(|r| r.label.as_target()).collect()
    }

    /// Create a subset of the dataset by indices
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            schema: self.schema.clone(),
            rows: indices.iter().map(|&i| self.rows[i]).collect(),
        }
    }

    /// Stratified random split.
    ///
    /// Each class is shuffled with a seeded RNG and `round(train_fraction ·
    /// class size)` of its rows go to the training partition, the rest to
    /// the test partition. Both partitions keep date order.
    pub fn stratified_split(&self, train_fraction: f64, seed: u64) -> Result<Split> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "split fraction must be in (0, 1), got {train_fraction}"
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut train_indices = Vec::new();
        let mut test_indices = Vec::new();

        for class in [Label::Bullish, Label::Bearish] {
            let mut members: Vec<usize> = self
                .rows
                .iter()
                .enumerate()
                .filter(|(_, r)| r.label == class)
                .map(|(i, _)| i)
                .collect();
            members.shuffle(&mut rng);

            let n_train = (train_fraction * members.len() as f64).round() as usize;
            let (train, test) = members.split_at(n_train);
            train_indices.extend_from_slice(train);
            test_indices.extend_from_slice(test);

            debug!(%class, train = train.len(), test = test.len(), "Stratified class");
        }

        train_indices.sort_unstable();
        test_indices.sort_unstable();

        Ok(Split {
            train: self.subset(&train_indices),
            test: self.subset(&test_indices),
        })
    }

    /// Save dataset to JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Load dataset from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let dataset = serde_json::from_reader(reader)?;
        Ok(dataset)
    }

    /// Save to CSV file: date, close, one column per feature, label
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec!["date".to_string(), "close".to_string()];
        header.extend(self.schema.names().into_iter().map(String::from));
        header.push("label".to_string());
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.date.to_string(), row.close.to_string()];
            record.extend(row.features.iter().map(|v| v.to_string()));
            record.push(row.label.to_string());
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}
