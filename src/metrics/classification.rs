//! Classification metrics for evaluating binary classifiers
//!
//! Bullish is the positive class throughout. Ratios with a zero denominator
//! are NaN instead of an error, so sweeping many thresholds never aborts.

use crate::error::{Error, Result};
use crate::features::Label;
use serde::{Deserialize, Serialize};

/// Confusion matrix for binary classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// True positives
    pub tp: usize,
    /// True negatives
    pub tn: usize,
    /// False positives
    pub fp: usize,
    /// False negatives
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Calculate confusion matrix from predictions
    pub fn from_labels(y_true: &[Label], y_pred: &[Label]) -> Result<Self> {
        check_len("predicted labels", y_true.len(), y_pred.len())?;

        let mut cm = Self::default();
        for (t, p) in y_true.iter().zip(y_pred) {
            match (t.is_positive(), p.is_positive()) {
                (true, true) => cm.tp += 1,
                (false, false) => cm.tn += 1,
                (false, true) => cm.fp += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        Ok(cm)
    }

    /// Total samples
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// Accuracy: (TP + TN) / Total
    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// Precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// Recall: TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// Specificity: TN / (TN + FP)
    pub fn specificity(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }

    /// F1 Score: 2 * (Precision * Recall) / (Precision + Recall)
    pub fn f1(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        let denom = precision + recall;
        if denom == 0.0 {
            return f64::NAN;
        }
        2.0 * precision * recall / denom
    }

    /// Print formatted confusion matrix
    pub fn display(&self) -> String {
        format!(
            "Confusion Matrix (positive = {}):\n\
             \n\
             Predicted:        Bearish  Bullish\n\
             Actual Bearish:   {:>7}  {:>7}  (TN/FP)\n\
             Actual Bullish:   {:>7}  {:>7}  (FN/TP)\n",
            Label::POSITIVE,
            self.tn,
            self.fp,
            self.fn_,
            self.tp
        )
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        f64::NAN
    } else {
        num as f64 / denom as f64
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}

/// One point of the ROC curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    #[serde(with = "float_repr")]
    pub false_positive_rate: f64,
    #[serde(with = "float_repr")]
    pub true_positive_rate: f64,
    /// Bullish iff probability >= threshold at this point
    #[serde(with = "float_repr")]
    pub threshold: f64,
}

/// ROC curve over every distinct observed probability.
///
/// Holds the scored samples; `points()` walks them lazily and can be called
/// any number of times.
#[derive(Debug, Clone)]
pub struct RocCurve {
    /// (probability, is_positive), highest probability first
    scored: Vec<(f64, bool)>,
    n_pos: usize,
    n_neg: usize,
}

impl RocCurve {
    pub fn new(y_true: &[Label], y_proba: &[f64]) -> Result<Self> {
        check_len("probabilities", y_true.len(), y_proba.len())?;

        let mut scored: Vec<(f64, bool)> = y_proba
            .iter()
            .zip(y_true)
            .map(|(&p, t)| (p, t.is_positive()))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let n_pos = scored.iter().filter(|(_, t)| *t).count();
        let n_neg = scored.len() - n_pos;

        Ok(Self {
            scored,
            n_pos,
            n_neg,
        })
    }

    /// Points in ascending false-positive rate, starting at (0, 0, +inf)
    pub fn points(&self) -> RocPoints<'_> {
        RocPoints {
            curve: self,
            next: 0,
            tp: 0,
            fp: 0,
            started: false,
        }
    }

    /// Area under the curve by the trapezoidal rule.
    ///
    /// NaN when either class is absent.
    pub fn auc(&self) -> f64 {
        if self.n_pos == 0 || self.n_neg == 0 {
            return f64::NAN;
        }

        let mut auc = 0.0;
        let mut prev: Option<RocPoint> = None;
        for point in self.points() {
            if let Some(p) = prev {
                auc += (point.false_positive_rate - p.false_positive_rate)
                    * (point.true_positive_rate + p.true_positive_rate)
                    / 2.0;
            }
            prev = Some(point);
        }
        auc
    }
}

impl<'a> IntoIterator for &'a RocCurve {
    type Item = RocPoint;
    type IntoIter = RocPoints<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.points()
    }
}

/// Lazy iterator over ROC points; tied scores form a single step
#[derive(Debug, Clone)]
pub struct RocPoints<'a> {
    curve: &'a RocCurve,
    next: usize,
    tp: usize,
    fp: usize,
    started: bool,
}

impl RocPoints<'_> {
    fn point(&self, threshold: f64) -> RocPoint {
        RocPoint {
            false_positive_rate: ratio(self.fp, self.curve.n_neg),
            true_positive_rate: ratio(self.tp, self.curve.n_pos),
            threshold,
        }
    }
}

impl Iterator for RocPoints<'_> {
    type Item = RocPoint;

    fn next(&mut self) -> Option<RocPoint> {
        if !self.started {
            self.started = true;
            return Some(self.point(f64::INFINITY));
        }

        let curve = self.curve;
        let scored = &curve.scored;
        let (score, _) = *scored.get(self.next)?;
        while let Some(&(p, positive)) = scored.get(self.next) {
            if p.total_cmp(&score).is_ne() {
                break;
            }
            if positive {
                self.tp += 1;
            } else {
                self.fp += 1;
            }
            self.next += 1;
        }

        Some(self.point(score))
    }
}

/// Everything downstream reporting needs about one evaluation.
///
/// Undefined ratios and the opening ROC threshold are written to JSON as the
/// strings `"NaN"` and `"inf"` so that a saved report reads back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub positive_class: Label,
    #[serde(with = "float_repr")]
    pub threshold: f64,
    pub confusion_matrix: ConfusionMatrix,
    #[serde(with = "float_repr")]
    pub accuracy: f64,
    #[serde(with = "float_repr")]
    pub precision: f64,
    #[serde(with = "float_repr")]
    pub recall: f64,
    #[serde(with = "float_repr")]
    pub f1: f64,
    #[serde(with = "float_repr")]
    pub specificity: f64,
    pub roc_points: Vec<RocPoint>,
    #[serde(with = "float_repr")]
    pub auc: f64,
}

impl EvaluationReport {
    /// Evaluate predicted labels and the probabilities they came from
    pub fn evaluate(
        y_true: &[Label],
        y_pred: &[Label],
        y_proba: &[f64],
        threshold: f64,
    ) -> Result<Self> {
        let cm = ConfusionMatrix::from_labels(y_true, y_pred)?;
        let roc = RocCurve::new(y_true, y_proba)?;

        Ok(Self {
            positive_class: Label::POSITIVE,
            threshold,
            confusion_matrix: cm,
            accuracy: cm.accuracy(),
            precision: cm.precision(),
            recall: cm.recall(),
            f1: cm.f1(),
            specificity: cm.specificity(),
            roc_points: roc.points().collect(),
            auc: roc.auc(),
        })
    }

    /// Evaluate probabilities, labelling Bullish iff `p >= threshold`
    pub fn from_probabilities(y_true: &[Label], y_proba: &[f64], threshold: f64) -> Result<Self> {
        let y_pred: Vec<Label> = y_proba
            .iter()
            .map(|&p| Label::from_positive(p >= threshold))
            .collect();
        Self::evaluate(y_true, &y_pred, y_proba, threshold)
    }

    /// Print a summary report
    pub fn report(&self) -> String {
        let mut s = String::new();
        s.push_str("Classification Metrics Report\n");
        s.push_str("=============================\n\n");
        s.push_str(&self.confusion_matrix.display());
        s.push_str(&format!("\nDecision threshold: {:.2}\n", self.threshold));
        s.push_str("\nMetrics:\n");
        s.push_str(&format!("  Accuracy:    {:.4}\n", self.accuracy));
        s.push_str(&format!("  Precision:   {:.4}\n", self.precision));
        s.push_str(&format!("  Recall:      {:.4}\n", self.recall));
        s.push_str(&format!("  F1 Score:    {:.4}\n", self.f1));
        s.push_str(&format!("  Specificity: {:.4}\n", self.specificity));
        s.push_str(&format!("  AUC-ROC:     {:.4}\n", self.auc));
        s
    }
}

/// Floats that may be NaN or infinite: numbers when finite, strings otherwise
mod float_repr {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Named(String),
    }

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Named(name) => name.parse::<f64>().map_err(serde::de::Error::custom),
        }
    }
}
