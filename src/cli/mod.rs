//! featprep CLI Module
//!
//! Command-line interface for the cleaning, transform and split stages.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::preprocessing::{FeaturePipeline, FeatureStats, PipelineConfig, PipelineReport};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "featprep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Prepare the employee dataset for bonus model training")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON configuration file; unset keys keep their defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Seed for the train/validation/test shuffle
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Measure tenure against this date (YYYY-MM-DD) instead of now
    #[arg(long, global = true)]
    pub reference_date: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Impute missing values and flatten the profile column
    Clean {
        /// Raw input CSV
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Cleaned output CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Derive features and one-hot encode a cleaned table
    Transform {
        /// Cleaned input CSV
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Model-ready output CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Split a model-ready table into train, validation and test files
    Split {
        /// Model-ready input CSV
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory receiving train/, validation/ and test/
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Run clean, transform and split in sequence
    Run {
        /// Raw input CSV
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory receiving every artifact
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Show shape and missing values of a CSV file
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,
    },
}

/// Build the pipeline configuration from `--config` and the global flags
pub fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    if let Some(date) = cli.reference_date {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .context("reference date out of range")?;
        config = config.with_reference_time(midnight);
    }

    Ok(config)
}

fn relocate(config: &mut PipelineConfig, out_dir: &Path) {
    let input = config.paths.input.clone();
    config.paths = crate::preprocessing::PipelinePaths::under(out_dir, input);
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_clean(
    mut config: PipelineConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    section("Clean");

    if let Some(input) = input {
        config.paths.input = input;
    }
    if let Some(output) = output {
        config.paths.cleaned = output;
    }

    step_run(&format!("Cleaning {}", config.paths.input.display()));
    let start = Instant::now();
    let pipeline = FeaturePipeline::with_config(config);
    let mut report = PipelineReport::default();
    let cleaned = pipeline.run_clean(&pipeline.config().paths, &mut report)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        cleaned.height(),
        cleaned.width(),
        start.elapsed()
    ));

    println!("  {:<16} {}", muted("Saved"), pipeline.config().paths.cleaned.display());
    println!();
    Ok(())
}

pub fn cmd_transform(
    mut config: PipelineConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    section("Transform");

    if let Some(input) = input {
        config.paths.cleaned = input;
    }
    if let Some(output) = output {
        config.paths.transformed = output;
    }

    step_run(&format!("Transforming {}", config.paths.cleaned.display()));
    let start = Instant::now();
    let pipeline = FeaturePipeline::with_config(config);
    let mut report = PipelineReport::default();
    let transformed = pipeline.run_transform(&pipeline.config().paths, &mut report)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        transformed.height(),
        transformed.width(),
        start.elapsed()
    ));

    println!("  {:<16} {}", muted("Saved"), pipeline.config().paths.transformed.display());
    println!();
    Ok(())
}

pub fn cmd_split(
    mut config: PipelineConfig,
    input: Option<PathBuf>,
    out_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    section("Split");

    if let Some(dir) = out_dir {
        relocate(&mut config, &dir);
    }
    if let Some(input) = input {
        config.paths.transformed = input;
    }

    step_run("Splitting");
    let pipeline = FeaturePipeline::with_config(config);
    let mut report = PipelineReport::default();
    pipeline.run_split(&pipeline.config().paths, &mut report)?;
    step_done(&format!("seed {}", pipeline.config().split.seed));

    print_partitions(&report);
    Ok(())
}

pub fn cmd_run(
    mut config: PipelineConfig,
    input: Option<PathBuf>,
    out_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    section("Run");

    if let Some(dir) = out_dir {
        relocate(&mut config, &dir);
    }
    if let Some(input) = input {
        config.paths.input = input;
    }

    let pipeline = FeaturePipeline::with_config(config);
    let report = pipeline.run(&pipeline.config().paths)?;

    println!("  {:<16} {:>8} {:>8} {:>10}", muted("Stage"), muted("Rows"), muted("Cols"), muted("Time"));
    println!("  {}", dim(&"─".repeat(46)));
    for stage in &report.stages {
        println!(
            "  {:<16} {:>8} {:>8} {:>9.3}s",
            stage.stage, stage.rows_out, stage.cols_out, stage.seconds
        );
    }
    println!("  {}", dim(&"─".repeat(46)));

    print_partitions(&report);
    Ok(())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Info");

    let loader = DataLoader::new();
    let info = loader.get_file_info(data_path)?;
    println!("  {:<16} {}", muted("File"), info.path.display());
    println!("  {:<16} {} bytes", muted("Size"), info.file_size);

    step_run("Loading data");
    let df = loader.load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    println!();
    println!("  {:<20} {:<12} {:>8} {:>12}", muted("Column"), muted("Type"), muted("Missing"), muted("Median"));
    println!("  {}", dim(&"─".repeat(56)));
    for stats in FeatureStats::for_frame(&df)? {
        let median = stats
            .median
            .map(|m| format!("{:.2}", m))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<20} {:<12} {:>8} {:>12}",
            stats.name,
            format!("{:?}", stats.dtype),
            stats.null_count,
            median
        );
    }
    println!();
    Ok(())
}

fn print_partitions(report: &PipelineReport) {
    println!();
    println!("  {:<16} {}", muted("Training"), format!("{} samples", report.train_rows).white());
    println!("  {:<16} {}", muted("Validation"), format!("{} samples", report.validation_rows).white());
    println!("  {:<16} {}", muted("Test"), format!("{} samples", report.test_rows).white());
    println!();
}
