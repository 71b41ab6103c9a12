//! End-to-end batch pipeline
//!
//! Each stage takes the previous stage's output by reference and returns a
//! new value: repair → indicators → labels → trim → split → scale → fit →
//! evaluate.

use crate::config::{DegeneratePolicy, PipelineConfig};
use crate::data::{Dataset, ObservationRecord, PriceSeries, Split};
use crate::error::Result;
use crate::features::{label_closes, trim_to_rows, FeatureSchema, IndicatorEngine, TrimSummary};
use crate::metrics::EvaluationReport;
use crate::models::{CancelToken, ForestConfig, TrainedClassifier};
use crate::preprocessing::ScalingParameters;
use tracing::info;

/// Every artefact of one run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Seed used for the split and the forest
    pub seed: u64,
    pub trim: TrimSummary,
    /// Eligible feature rows, unscaled, in date order
    pub rows: Dataset,
    /// Unscaled partitions
    pub split: Split,
    pub scaler: ScalingParameters,
    /// Features left unscaled because they had no training variance
    pub degenerate_features: Vec<String>,
    /// Scaled partitions fed to the classifier
    pub scaled: Split,
    pub classifier: TrainedClassifier,
    /// Bullish probabilities for `scaled.test`, row for row
    pub test_probabilities: Vec<f64>,
    pub report: EvaluationReport,
}

impl PipelineOutput {
    /// Re-evaluate the same test predictions at another threshold
    pub fn evaluate_at(&self, threshold: f64) -> Result<EvaluationReport> {
        EvaluationReport::from_probabilities(
            &self.scaled.test.labels(),
            &self.test_probabilities,
            threshold,
        )
    }
}

/// Runs the forecasting stages in order
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    schema: FeatureSchema,
    cancel: CancelToken,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            schema: FeatureSchema::v1(),
            cancel: CancelToken::new(),
        })
    }

    /// Share a cancel token with the caller to abort classifier training
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Indicators, labels and trimming
    pub fn build_rows(&self, series: &PriceSeries) -> Result<(Dataset, TrimSummary)> {
        let engine = IndicatorEngine::new((&self.config).into());
        let indicators = engine.compute(series)?;
        let labels = label_closes(&series.closes(), self.config.label_horizon);
        trim_to_rows(series, &indicators, &labels, &self.schema)
    }

    /// Repair raw observations, then run every stage
    pub fn run_records(&self, records: Vec<ObservationRecord>) -> Result<PipelineOutput> {
        let series = PriceSeries::repair(records)?;
        self.run(&series)
    }

    /// Run every stage on a repaired series
    pub fn run(&self, series: &PriceSeries) -> Result<PipelineOutput> {
        let seed = self.config.resolve_seed();

        let (rows, trim) = self.build_rows(series)?;
        let counts = rows.class_counts();
        info!(
            records = series.len(),
            rows = rows.n_samples(),
            bullish = counts.bullish,
            bearish = counts.bearish,
            "Built feature rows"
        );

        let split = rows.stratified_split(self.config.split_fraction, seed)?;
        info!(
            train = split.train.n_samples(),
            test = split.test.n_samples(),
            "Stratified split"
        );

        let (scaler, degenerate_features) = match self.config.degenerate_features {
            DegeneratePolicy::Fail => (ScalingParameters::fit(&split.train)?, Vec::new()),
            DegeneratePolicy::Identity => ScalingParameters::fit_lenient(&split.train)?,
        };
        let scaled = Split {
            train: scaler.transform(&split.train)?,
            test: scaler.transform(&split.test)?,
        };

        let forest_config = ForestConfig::from_params(&self.config.forest, seed);
        let classifier =
            TrainedClassifier::fit_with_cancel(&scaled.train, forest_config, &self.cancel)?;

        let test_probabilities = classifier.predict_dataset(&scaled.test)?;
        let report = EvaluationReport::from_probabilities(
            &scaled.test.labels(),
            &test_probabilities,
            self.config.decision_threshold,
        )?;
        info!(
            auc = report.auc,
            precision = report.precision,
            recall = report.recall,
            "Evaluated on test partition"
        );

        Ok(PipelineOutput {
            seed,
            trim,
            rows,
            split,
            scaler,
            degenerate_features,
            scaled,
            classifier,
            test_probabilities,
            report,
        })
    }
}
