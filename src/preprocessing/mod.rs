//! Feature preparation stages
//!
//! The stages run in a fixed order over one table:
//! - Missing value imputation (median / sentinel)
//! - Profile flattening (JSON column → scalar columns)
//! - Feature derivation (address length, salary and age buckets, tenure)
//! - One-hot encoding
//! - Seeded train / validation / test splitting

mod config;
mod encoder;
mod imputer;
mod pipeline;
pub mod features;
pub mod profile;
pub mod splitter;
pub mod transforms;

pub use config::{BinSpec, EncodedColumn, PartitionFormat, PipelineConfig, PipelinePaths, SplitConfig};
pub use encoder::OneHotEncoder;
pub use features::FeatureDeriver;
pub use imputer::{ImputeStrategy, ImputeValue, Imputer};
pub use pipeline::{FeaturePipeline, PipelineReport, StageReport};
pub use profile::{parse_profile, MalformedProfilePolicy, Profile, ProfileFlattener};
pub use splitter::{DatasetSplitter, Partition, Partitions};
pub use transforms::Binner;

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column data type for preprocessing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
    Nested,
    Unknown,
}

impl ColumnType {
    pub fn of(dtype: &DataType) -> Self {
        match dtype {
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 |
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 |
            DataType::Float32 | DataType::Float64 => ColumnType::Numeric,
            DataType::String => ColumnType::Categorical,
            DataType::Struct(_) => ColumnType::Nested,
            _ => ColumnType::Unknown,
        }
    }
}

/// Per-column statistics, used for diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureStats {
    pub name: String,
    pub dtype: ColumnType,
    pub count: usize,
    pub null_count: usize,
    pub median: Option<f64>,
    pub unique_count: Option<usize>,
}

impl FeatureStats {
    /// Create new feature statistics
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
            count: 0,
            null_count: 0,
            median: None,
            unique_count: None,
        }
    }

    /// Compute statistics from any series
    pub fn from_series(name: &str, series: &Series) -> Result<Self> {
        let mut stats = Self::new(name, ColumnType::of(series.dtype()));
        stats.count = series.len();
        stats.null_count = series.null_count();

        match stats.dtype {
            ColumnType::Numeric => {
                stats.median = imputer::column_median(series)?;
            }
            ColumnType::Categorical => {
                stats.unique_count = Some(series.n_unique()?);
            }
            _ => {}
        }

        Ok(stats)
    }

    /// Statistics for every column of a frame, in column order
    pub fn for_frame(df: &DataFrame) -> Result<Vec<Self>> {
        df.get_columns()
            .iter()
            .map(|c| Self::from_series(c.name().as_str(), c.as_materialized_series()))
            .collect()
    }
}
