//! Run the direction forecast pipeline over a local daily CSV
//!
//! Usage: cargo run --bin forecast -- data/daily.csv --config pipeline.toml --threshold 0.55

use anyhow::{Context, Result};
use clap::Parser;
use direction_ml::data::read_csv;
use direction_ml::{Pipeline, PipelineConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Forecast the weekly direction of a daily price series")]
struct Args {
    /// CSV with Date, Open, High, Low, Close, Volume columns
    input: PathBuf,

    /// TOML configuration; missing keys use the defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bullish probability needed for a Bullish prediction
    #[arg(long)]
    threshold: Option<f64>,

    /// Seed for the split and the forest
    #[arg(long, conflicts_with = "unseeded")]
    seed: Option<u64>,

    /// Draw the seed from entropy (not reproducible)
    #[arg(long)]
    unseeded: bool,

    /// Number of trees
    #[arg(short, long)]
    trees: Option<usize>,

    /// Share of each class placed in the training partition
    #[arg(long)]
    split: Option<f64>,

    /// Write the eligible feature rows (unscaled) to CSV
    #[arg(long)]
    rows_csv: Option<PathBuf>,

    /// Write the evaluation report to JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Write the trained classifier to JSON
    #[arg(long)]
    model_json: Option<PathBuf>,

    /// Write the effective configuration to TOML
    #[arg(long)]
    save_config: Option<PathBuf>,
}

impl Args {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(threshold) = self.threshold {
            config.decision_threshold = threshold;
        }
        if let Some(seed) = self.seed {
            config.random_seed = Some(seed);
        }
        if self.unseeded {
            config.random_seed = None;
        }
        if let Some(trees) = self.trees {
            config.forest.n_trees = trees;
        }
        if let Some(split) = self.split {
            config.split_fraction = split;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("direction_ml=info")),
        )
        .init();

    let args = Args::parse();
    let config = args.pipeline_config()?;

    println!("===========================================");
    println!("  Weekly Direction Forecast");
    println!("===========================================\n");

    info!("Reading {}", args.input.display());
    let records = read_csv(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let pipeline = Pipeline::new(config.clone())?;
    let output = pipeline.run_records(records).context("Pipeline failed")?;

    println!("Seed:         {}", output.seed);
    println!(
        "Feature rows: {} (dropped {} warm-up, {} horizon)",
        output.trim.kept, output.trim.leading, output.trim.trailing
    );
    for (name, partition) in [("Train set:", &output.split.train), ("Test set:", &output.split.test)] {
        let counts = partition.class_counts();
        println!(
            "{:13} {} samples ({:.1}% Bullish)",
            name,
            counts.total(),
            counts.bullish_ratio() * 100.0
        );
    }
    if !output.degenerate_features.is_empty() {
        println!("Unscaled:     {}", output.degenerate_features.join(", "));
    }
    if let Some(oob) = output.classifier.forest().oob_score() {
        println!("OOB accuracy: {:.2}%", oob * 100.0);
    }
    println!();

    println!("{}", output.report.report());

    println!("=== Feature Importance Ranking ===\n");
    for (i, (name, importance)) in output.classifier.feature_importance_ranking().iter().enumerate() {
        let bar = "█".repeat((importance * 40.0) as usize);
        println!("{:2}. {:20} {:.4} {}", i + 1, name, importance, bar);
    }

    if let Some(path) = &args.rows_csv {
        output
            .rows
            .save_csv(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Feature rows written to {}", path.display());
    }

    if let Some(path) = &args.report_json {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &output.report)?;
        info!("Report written to {}", path.display());
    }

    if let Some(path) = &args.model_json {
        output
            .classifier
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Model written to {}", path.display());
    }

    if let Some(path) = &args.save_config {
        config
            .to_file(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(())
}
