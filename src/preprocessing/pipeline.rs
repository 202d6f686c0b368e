//! End-to-end feature preparation pipeline

use crate::error::Result;
use crate::utils::{DataLoader, DataSaver};
use super::{
    config::{PipelineConfig, PipelinePaths},
    encoder::OneHotEncoder,
    features::FeatureDeriver,
    imputer::{ImputeStrategy, Imputer},
    profile::ProfileFlattener,
    splitter::{DatasetSplitter, Partitions},
    FeatureStats,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Timing and row counts of one pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub rows_in: usize,
    pub rows_out: usize,
    pub cols_out: usize,
    pub seconds: f64,
}

/// Summary of a full run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub test_rows: usize,
}

impl PipelineReport {
    pub fn total_seconds(&self) -> f64 {
        self.stages.iter().map(|s| s.seconds).sum()
    }

    fn record(&mut self, stage: &str, rows_in: usize, out: &DataFrame, start: Instant) {
        self.stages.push(StageReport {
            stage: stage.to_string(),
            rows_in,
            rows_out: out.height(),
            cols_out: out.width(),
            seconds: start.elapsed().as_secs_f64(),
        });
    }
}

/// Runs impute → flatten → derive → encode → split over one table
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    config: PipelineConfig,
}

impl Default for FeaturePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl FeaturePipeline {
    /// Create a new pipeline with default configuration
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Create a new pipeline with custom configuration
    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Median-fill numeric columns, sentinel-fill categorical ones
    pub fn impute(&self, df: &DataFrame) -> Result<DataFrame> {
        for name in self
            .config
            .median_columns
            .iter()
            .chain(&self.config.sentinel_columns)
        {
            if let Ok(column) = df.column(name) {
                let stats = FeatureStats::from_series(name, column.as_materialized_series())?;
                tracing::info!(column = %name, missing = stats.null_count, "missing values before imputation");
            }
        }

        let numeric: Vec<&str> = self.config.median_columns.iter().map(String::as_str).collect();
        let mut median_imputer = Imputer::new(ImputeStrategy::Median);
        let df = median_imputer.fit_transform(df, &numeric)?;
        for name in &numeric {
            tracing::info!(column = %name, fill = ?median_imputer.fill_value(name), "median fill");
        }

        let categorical: Vec<&str> = self.config.sentinel_columns.iter().map(String::as_str).collect();
        let mut sentinel_imputer =
            Imputer::new(ImputeStrategy::ConstantString(self.config.missing_category.clone()));
        sentinel_imputer.fit_transform(&df, &categorical)
    }

    /// Project the nested profile column into scalar columns
    pub fn flatten_profile(&self, df: &DataFrame) -> Result<DataFrame> {
        ProfileFlattener::new(&self.config.profile_column, &self.config.profile_fields)
            .with_policy(self.config.malformed_profile)
            .transform(df)
    }

    /// Imputation plus profile flattening: the "cleaned" table
    pub fn clean(&self, df: &DataFrame) -> Result<DataFrame> {
        let df = self.impute(df)?;
        self.flatten_profile(&df)
    }

    /// Derived features plus one-hot encoding: the model-ready table
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let deriver = FeatureDeriver::from_config(&self.config);
        tracing::info!(reference_time = %deriver.reference_time(), "deriving features");
        let df = deriver.transform(df)?;

        OneHotEncoder::new(&self.config.encoded_columns).fit_transform(&df)
    }

    /// Partition a model-ready table
    pub fn split(&self, df: &DataFrame) -> Result<Partitions> {
        DatasetSplitter::with_config(self.config.split.clone()).split(df, &self.config.label)
    }

    /// Stage 1: load the raw input and write the cleaned table
    pub fn run_clean(&self, paths: &PipelinePaths, report: &mut PipelineReport) -> Result<DataFrame> {
        let start = Instant::now();
        let raw = DataLoader::new().load_csv(&paths.input)?;
        report.record("load", raw.height(), &raw, start);

        let start = Instant::now();
        let mut cleaned = self.clean(&raw)?;
        report.record("clean", raw.height(), &cleaned, start);

        DataSaver::save_csv(&mut cleaned, &paths.cleaned, true)?;
        tracing::info!(path = %paths.cleaned.display(), "saved cleaned data");
        Ok(cleaned)
    }

    /// Stage 2: read the cleaned table back and write the model-ready one
    pub fn run_transform(&self, paths: &PipelinePaths, report: &mut PipelineReport) -> Result<DataFrame> {
        let cleaned = DataLoader::new().load_csv(&paths.cleaned)?;

        let start = Instant::now();
        let mut transformed = self.transform(&cleaned)?;
        report.record("transform", cleaned.height(), &transformed, start);

        DataSaver::save_csv(&mut transformed, &paths.transformed, true)?;
        tracing::info!(path = %paths.transformed.display(), "saved transformed data");
        Ok(transformed)
    }

    /// Stage 3: split the model-ready table and write the partitions
    pub fn run_split(&self, paths: &PipelinePaths, report: &mut PipelineReport) -> Result<Partitions> {
        let transformed = DataLoader::new().load_csv(&paths.transformed)?;

        let start = Instant::now();
        let partitions = self.split(&transformed)?;
        report.stages.push(StageReport {
            stage: "split".to_string(),
            rows_in: transformed.height(),
            rows_out: partitions.total_rows(),
            cols_out: transformed.width(),
            seconds: start.elapsed().as_secs_f64(),
        });
        report.train_rows = partitions.train.height();
        report.validation_rows = partitions.validation.height();
        report.test_rows = partitions.test.height();

        partitions.write(paths)?;
        Ok(partitions)
    }

    /// Run all three stages against `paths`
    pub fn run(&self, paths: &PipelinePaths) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();
        self.run_clean(paths, &mut report)?;
        self.run_transform(paths, &mut report)?;
        self.run_split(paths, &mut report)?;

        tracing::info!(
            seconds = report.total_seconds(),
            train = report.train_rows,
            validation = report.validation_rows,
            test = report.test_rows,
            "pipeline finished"
        );
        Ok(report)
    }
}
