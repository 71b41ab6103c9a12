//! Windowing trimmer: keeps only records with every field defined

use super::engine::IndicatorSet;
use super::labels::Label;
use super::schema::FeatureSchema;
use crate::data::{Dataset, FeatureRow, PriceSeries};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How many records the trimmer dropped and where
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimSummary {
    /// Dropped before the first eligible record (indicator warm-up)
    pub leading: usize,
    /// Dropped after the last eligible record (label horizon)
    pub trailing: usize,
    /// Dropped between eligible records
    pub interior: usize,
    pub kept: usize,
}

/// Join indicators and labels into feature rows, dropping every record with
/// an undefined indicator or label.
///
/// Window-based sources only leave leading and trailing gaps, so `interior`
/// is expected to be zero.
pub fn trim_to_rows(
    series: &PriceSeries,
    indicators: &[IndicatorSet],
    labels: &[Option<Label>],
    schema: &FeatureSchema,
) -> Result<(Dataset, TrimSummary)> {
    let n = series.len();
    if indicators.len() != n {
        return Err(Error::LengthMismatch {
            what: "indicators",
            expected: n,
            actual: indicators.len(),
        });
    }
    if labels.len() != n {
        return Err(Error::LengthMismatch {
            what: "labels",
            expected: n,
            actual: labels.len(),
        });
    }
    schema.ensure_width(super::N_FEATURES)?;

    let mut kept_indices = Vec::new();
    let mut rows = Vec::new();

    for (i, ((bar, set), label)) in series
        .bars()
        .iter()
        .zip(indicators)
        .zip(labels)
        .enumerate()
    {
        if let (Some(features), Some(label)) = (set.to_vector(schema), label) {
            kept_indices.push(i);
            rows.push(FeatureRow {
                date: bar.date,
                close: bar.close,
                features,
                label: *label,
            });
        }
    }

    let summary = match (kept_indices.first(), kept_indices.last()) {
        (Some(&first), Some(&last)) => TrimSummary {
            leading: first,
            trailing: n - last - 1,
            interior: (last - first + 1) - kept_indices.len(),
            kept: kept_indices.len(),
        },
        _ => TrimSummary {
            leading: n,
            ..Default::default()
        },
    };

    if summary.interior > 0 {
        warn!(interior = summary.interior, "Dropped records inside the series");
    }
    debug!(
        leading = summary.leading,
        trailing = summary.trailing,
        kept = summary.kept,
        "Trimmed windows"
    );

    Ok((Dataset::from_rows(schema.clone(), rows), summary))
}
