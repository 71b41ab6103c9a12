//! Daily price series: raw observations, repair and ordering
//!
//! Raw rows may arrive in any order and with missing cells. Before any
//! window computation they are sorted, checked for duplicate dates and
//! forward-filled. A column whose first value is missing cannot be repaired.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// One raw trading day as delivered by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl ObservationRecord {
    /// Record with every field present
    pub fn complete(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
        }
    }
}

/// A repaired trading day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Strictly date-ordered, gap-free series of bars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Wrap bars that are already repaired.
    ///
    /// Fails unless dates are strictly ascending.
    pub fn from_bars(bars: Vec<Bar>) -> Result<Self> {
        for pair in bars.windows(2) {
            let (previous, next) = (pair[0].date, pair[1].date);
            if previous == next {
                return Err(Error::DuplicateDate(next));
            }
            if previous > next {
                return Err(Error::UnorderedDates { previous, next });
            }
        }
        Ok(Self { bars })
    }

    /// Sort raw observations by date and forward-fill missing cells.
    ///
    /// Each missing value takes the last valid value of the same column.
    pub fn repair(mut records: Vec<ObservationRecord>) -> Result<Self> {
        records.sort_by_key(|r| r.date);

        if let Some(pair) = records.windows(2).find(|p| p[0].date == p[1].date) {
            return Err(Error::DuplicateDate(pair[0].date));
        }

        let mut last: [Option<f64>; 5] = [None; 5];
        let mut filled = 0usize;
        let mut bars = Vec::with_capacity(records.len());

        for record in &records {
            let fields = [
                ("open", record.open),
                ("high", record.high),
                ("low", record.low),
                ("close", record.close),
                ("volume", record.volume),
            ];
            let mut values = [0.0; 5];

            for (slot, (field, value)) in fields.into_iter().enumerate() {
                let value = value.filter(|v| v.is_finite());
                values[slot] = match (value, last[slot]) {
                    (Some(v), _) => v,
                    (None, Some(prev)) => {
                        filled += 1;
                        prev
                    }
                    (None, None) => {
                        return Err(Error::MissingLeadingValue {
                            field,
                            date: record.date,
                        })
                    }
                };
                last[slot] = Some(values[slot]);
            }

            let [open, high, low, close, volume] = values;
            bars.push(Bar::new(record.date, open, high, low, close, volume));
        }

        if filled > 0 {
            debug!(filled, "Forward-filled missing values");
        }

        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}

/// Parse a numeric cell; blanks and the usual NA markers are missing.
fn parse_cell(raw: &str) -> Result<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
    {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| Error::Parse(format!("'{trimmed}' is not a number")))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| Error::Parse(format!("'{trimmed}' is not a date")))
}

/// Read a `Date,Open,High,Low,Close,Volume` CSV file.
///
/// Header names are matched case-insensitively and extra columns are ignored.
/// The records are returned unrepaired, in file order.
pub fn read_csv(path: &Path) -> Result<Vec<ObservationRecord>> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::Parse(format!("missing column '{name}'")))
    };

    let date_col = column("date")?;
    let open_col = column("open")?;
    let high_col = column("high")?;
    let low_col = column("low")?;
    let close_col = column("close")?;
    let volume_col = column("volume")?;

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let cell = |idx: usize| row.get(idx).unwrap_or("");

        records.push(ObservationRecord {
            date: parse_date(cell(date_col))?,
            open: parse_cell(cell(open_col))?,
            high: parse_cell(cell(high_col))?,
            low: parse_cell(cell(low_col))?,
            close: parse_cell(cell(close_col))?,
            volume: parse_cell(cell(volume_col))?,
        });
    }

    info!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_repair_sorts_and_forward_fills() {
        let records = vec![
            ObservationRecord::complete(day(3), 3.0, 3.5, 2.5, 3.2, 300.0),
            ObservationRecord::complete(day(1), 1.0, 1.5, 0.5, 1.2, 100.0),
            ObservationRecord {
                date: day(2),
                open: Some(2.0),
                high: None,
                low: Some(1.5),
                close: None,
                volume: Some(200.0),
            },
        ];

        let series = PriceSeries::repair(records).unwrap();
        let bars = series.bars();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, day(1));
        assert_eq!(bars[1].date, day(2));
        assert_eq!(bars[1].high, 1.5);
        assert_eq!(bars[1].close, 1.2);
        assert_eq!(bars[2].date, day(3));
    }

    #[test]
    fn test_repair_rejects_leading_gap() {
        let records = vec![
            ObservationRecord {
                volume: None,
                ..ObservationRecord::complete(day(1), 1.0, 1.0, 1.0, 1.0, 1.0)
            },
            ObservationRecord::complete(day(2), 1.0, 1.0, 1.0, 1.0, 1.0),
        ];

        match PriceSeries::repair(records) {
            Err(Error::MissingLeadingValue { field, date }) => {
                assert_eq!(field, "volume");
                assert_eq!(date, day(1));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_repair_rejects_duplicate_dates() {
        let records = vec![
            ObservationRecord::complete(day(1), 1.0, 1.0, 1.0, 1.0, 1.0),
            ObservationRecord::complete(day(1), 2.0, 2.0, 2.0, 2.0, 2.0),
        ];
        assert!(matches!(
            PriceSeries::repair(records),
            Err(Error::DuplicateDate(_))
        ));
    }

    #[test]
    fn test_from_bars_requires_ascending_dates() {
        let bars = vec![
            Bar::new(day(2), 1.0, 1.0, 1.0, 1.0, 1.0),
            Bar::new(day(1), 1.0, 1.0, 1.0, 1.0, 1.0),
        ];
        assert!(matches!(
            PriceSeries::from_bars(bars),
            Err(Error::UnorderedDates { .. })
        ));
    }

    #[test]
    fn test_read_csv_with_missing_markers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,Open,High,Low,Close,Volume,Adjusted").unwrap();
        writeln!(file, "2024-01-02,10,11,9,10.5,1000,10.5").unwrap();
        writeln!(file, "2024-01-01,9,10,8,9.5,900,9.5").unwrap();
        writeln!(file, "2024-01-03,NA,12,10,,1100,11").unwrap();
        file.flush().unwrap();

        let records = read_csv(file.path()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].open, None);
        assert_eq!(records[2].close, None);
        assert_eq!(records[2].high, Some(12.0));

        let series = PriceSeries::repair(records).unwrap();
        assert_eq!(series.bars()[0].date, day(1));
        assert_eq!(series.bars()[2].open, 10.0);
        assert_eq!(series.bars()[2].close, 10.5);
    }
}
