//! Integration tests for the direction forecast pipeline

use chrono::{Duration, NaiveDate};
use direction_ml::prelude::*;
use std::fmt::Write as _;
use std::path::Path;

/// 100 + 10·sin with a 20-day period, high/low one unit around the close
fn sine_bars(n: usize) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + 10.0 * (i as f64 * 2.0 * std::f64::consts::PI / 20.0).sin();
            Bar::new(
                start + Duration::days(i as i64),
                close,
                close + 1.0,
                close - 1.0,
                close,
                500_000.0,
            )
        })
        .collect()
}

fn write_csv(path: &Path, bars: &[Bar]) {
    let mut content = String::from("Date,Open,High,Low,Close,Volume\n");
    // newest first, with a hole in the volume column
    for (i, bar) in bars.iter().enumerate().rev() {
        let volume = if i == 50 { "NA".to_string() } else { bar.volume.to_string() };
        writeln!(
            content,
            "{},{},{},{},{},{}",
            bar.date, bar.open, bar.high, bar.low, bar.close, volume
        )
        .unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn small_forest() -> PipelineConfig {
    PipelineConfig {
        forest: ForestParams {
            n_trees: 20,
            max_depth: 6,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_sinusoid_end_to_end() {
    let series = PriceSeries::from_bars(sine_bars(100)).unwrap();
    let output = Pipeline::new(small_forest()).unwrap().run(&series).unwrap();

    assert!(!output.rows.is_empty());
    assert_eq!(output.rows.n_samples(), output.trim.kept);
    assert_eq!(
        output.split.train.n_samples() + output.split.test.n_samples(),
        output.rows.n_samples()
    );
    assert_eq!(output.classifier.forest().n_trees(), 20);
    assert_eq!(output.report.confusion_matrix.total(), output.split.test.n_samples());
    assert_eq!(output.test_probabilities.len(), output.split.test.n_samples());
    assert!(output
        .test_probabilities
        .iter()
        .all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn test_same_seed_same_predictions() {
    let series = PriceSeries::from_bars(sine_bars(100)).unwrap();
    let pipeline = Pipeline::new(small_forest()).unwrap();

    let first = pipeline.run(&series).unwrap();
    let second = pipeline.run(&series).unwrap();

    assert_eq!(first.split.test.rows, second.split.test.rows);
    assert_eq!(first.test_probabilities, second.test_probabilities);
}

#[test]
fn test_partitions_keep_date_order() {
    let series = PriceSeries::from_bars(sine_bars(140)).unwrap();
    let output = Pipeline::new(small_forest()).unwrap().run(&series).unwrap();

    for partition in [&output.split.train, &output.split.test] {
        assert!(partition.rows.windows(2).all(|w| w[0].date < w[1].date));
    }
}

#[test]
fn test_csv_records_are_repaired_before_features() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daily.csv");
    let bars = sine_bars(100);
    write_csv(&path, &bars);

    let records = read_csv(&path).unwrap();
    assert_eq!(records.len(), 100);
    assert_eq!(records[0].date, bars[99].date);
    assert!(records[49].volume.is_none());

    let output = Pipeline::new(small_forest())
        .unwrap()
        .run_records(records)
        .unwrap();
    assert_eq!(output.trim.kept, 100 - 37 - 7);
}

#[test]
fn test_config_file_drives_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("pipeline.toml");
    std::fs::write(
        &config_path,
        r#"
        label_horizon = 5
        decision_threshold = 0.5
        random_seed = 3

        [forest]
        n_trees = 8
        "#,
    )
    .unwrap();

    let config = PipelineConfig::from_file(&config_path).unwrap();
    let series = PriceSeries::from_bars(sine_bars(100)).unwrap();
    let output = Pipeline::new(config).unwrap().run(&series).unwrap();

    assert_eq!(output.seed, 3);
    assert_eq!(output.trim.trailing, 5);
    assert_eq!(output.classifier.forest().n_trees(), 8);
    assert_eq!(output.report.threshold, 0.5);
}

#[test]
fn test_saved_model_scores_like_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.json");

    let series = PriceSeries::from_bars(sine_bars(100)).unwrap();
    let output = Pipeline::new(small_forest()).unwrap().run(&series).unwrap();
    output.classifier.save(&model_path).unwrap();

    let loaded = TrainedClassifier::load(&model_path).unwrap();
    let reloaded = loaded.predict_dataset(&output.scaled.test).unwrap();
    for (a, b) in reloaded.iter().zip(&output.test_probabilities) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn test_short_history_cannot_train() {
    let series = PriceSeries::from_bars(sine_bars(40)).unwrap();
    let result = Pipeline::new(small_forest()).unwrap().run(&series);

    assert!(matches!(result, Err(Error::EmptyPartition { .. })));
}
