//! Pipeline configuration

use crate::error::{PrepError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::profile::MalformedProfilePolicy;

/// Locations of the input table and every artifact the pipeline writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelinePaths {
    pub input: PathBuf,
    pub cleaned: PathBuf,
    pub transformed: PathBuf,
    pub train: PathBuf,
    pub validation: PathBuf,
    pub test: PathBuf,
}

impl Default for PipelinePaths {
    fn default() -> Self {
        Self {
            input: PathBuf::from("/opt/ml/processing/input/mock_data.csv"),
            cleaned: PathBuf::from("/opt/ml/processing/output/cleaned_data.csv"),
            transformed: PathBuf::from("/opt/ml/processing/output/transformed_data.csv"),
            train: PathBuf::from("/opt/ml/processing/train/train.csv"),
            validation: PathBuf::from("/opt/ml/processing/validation/validation.csv"),
            test: PathBuf::from("/opt/ml/processing/test/test.csv"),
        }
    }
}

impl PipelinePaths {
    /// Place every artifact under `dir`, keeping the default file names
    pub fn under(dir: impl AsRef<Path>, input: impl Into<PathBuf>) -> Self {
        let dir = dir.as_ref();
        Self {
            input: input.into(),
            cleaned: dir.join("output").join("cleaned_data.csv"),
            transformed: dir.join("output").join("transformed_data.csv"),
            train: dir.join("train").join("train.csv"),
            validation: dir.join("validation").join("validation.csv"),
            test: dir.join("test").join("test.csv"),
        }
    }
}

/// Bucketing rule turning a numeric column into a labelled categorical one.
///
/// Intervals are right-closed `(edges[i], edges[i + 1]]`. With
/// `include_lowest` the first interval also contains `edges[0]`. With
/// `open_ended` one more interval `(edges[last], +inf)` is appended, so
/// `labels` must then have as many entries as `edges`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinSpec {
    pub source: String,
    pub target: String,
    pub edges: Vec<f64>,
    pub labels: Vec<String>,
    #[serde(default = "default_true")]
    pub include_lowest: bool,
    #[serde(default)]
    pub open_ended: bool,
}

fn default_true() -> bool {
    true
}

impl BinSpec {
    pub fn salary() -> Self {
        Self {
            source: "salary".to_string(),
            target: "salary_category".to_string(),
            edges: vec![0.0, 50_000.0, 70_000.0, 100_000.0],
            labels: vec!["low".into(), "medium".into(), "high".into()],
            include_lowest: true,
            open_ended: false,
        }
    }

    pub fn age() -> Self {
        Self {
            source: "age".to_string(),
            target: "age_group".to_string(),
            edges: vec![0.0, 25.0, 35.0, 45.0, 55.0],
            labels: vec![
                "Young".into(),
                "Early Career".into(),
                "Mid Career".into(),
                "Senior".into(),
                "Experienced".into(),
            ],
            include_lowest: true,
            open_ended: true,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.edges.len() < 2 && !(self.open_ended && self.edges.len() == 1) {
            return Err(PrepError::ConfigError(format!(
                "bins for '{}' need at least one interval",
                self.source
            )));
        }
        if self.edges.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(PrepError::ConfigError(format!(
                "bin edges for '{}' must be strictly increasing",
                self.source
            )));
        }
        let expected = self.edges.len() - 1 + usize::from(self.open_ended);
        if self.labels.len() != expected {
            return Err(PrepError::ConfigError(format!(
                "bins for '{}' have {} labels, expected {}",
                self.source,
                self.labels.len(),
                expected
            )));
        }
        Ok(())
    }
}

/// A categorical column expanded into indicator columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedColumn {
    pub column: String,
    pub prefix: String,
    /// Fixed label set; `None` means "whatever the table contains"
    #[serde(default)]
    pub vocabulary: Option<Vec<String>>,
}

impl EncodedColumn {
    pub fn new(column: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            prefix: prefix.into(),
            vocabulary: None,
        }
    }
}

/// On-disk layout of one partition file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionFormat {
    /// Move the label column to the front
    pub label_first: bool,
    /// Write a header row
    pub include_header: bool,
}

/// Train / validation / test split settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Share of all rows held out from training
    pub first_holdout: f64,
    /// Share of the held-out rows that becomes the test set
    pub second_holdout: f64,
    pub seed: u64,
    pub train_format: PartitionFormat,
    pub validation_format: PartitionFormat,
    pub test_format: PartitionFormat,
}

impl Default for SplitConfig {
    fn default() -> Self {
        let headless = PartitionFormat {
            label_first: true,
            include_header: false,
        };
        Self {
            first_holdout: 0.3,
            second_holdout: 0.33,
            seed: 42,
            train_format: headless,
            validation_format: headless,
            test_format: PartitionFormat {
                label_first: false,
                include_header: true,
            },
        }
    }
}

/// Configuration for the feature preparation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PipelinePaths,

    /// Numeric columns filled with their median
    pub median_columns: Vec<String>,

    /// Categorical columns filled with `missing_category`
    pub sentinel_columns: Vec<String>,

    /// Sentinel written into missing categorical cells
    pub missing_category: String,

    /// Nested JSON column and the keys projected out of it
    pub profile_column: String,
    pub profile_fields: Vec<String>,
    pub malformed_profile: MalformedProfilePolicy,

    /// Column whose string length becomes `address_length`
    pub address_column: String,

    pub salary_bins: BinSpec,
    pub age_bins: BinSpec,

    /// Target column; rows where it is null are dropped
    pub label: String,

    pub hire_date_column: String,

    /// Instant tenure is measured against; `None` uses the local clock
    pub reference_time: Option<NaiveDateTime>,

    /// Columns removed before the model-ready table is written
    pub drop_columns: Vec<String>,

    pub encoded_columns: Vec<EncodedColumn>,

    pub split: SplitConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: PipelinePaths::default(),
            median_columns: vec!["age".to_string(), "salary".to_string()],
            sentinel_columns: vec!["department".to_string()],
            missing_category: "Unknown".to_string(),
            profile_column: "profile".to_string(),
            profile_fields: vec![
                "address".to_string(),
                "phone".to_string(),
                "email".to_string(),
            ],
            malformed_profile: MalformedProfilePolicy::Abort,
            address_column: "address".to_string(),
            salary_bins: BinSpec::salary(),
            age_bins: BinSpec::age(),
            label: "bonus".to_string(),
            hire_date_column: "hire_date".to_string(),
            reference_time: None,
            drop_columns: ["id", "address", "phone", "name", "hire_date", "email"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            encoded_columns: vec![
                EncodedColumn::new("department", "dept"),
                EncodedColumn::new("age_group", "age"),
                EncodedColumn::new("salary_category", "salary"),
            ],
            split: SplitConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing keys take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PrepError::ConfigError(format!("cannot read '{}': {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method to set artifact paths
    pub fn with_paths(mut self, paths: PipelinePaths) -> Self {
        self.paths = paths;
        self
    }

    /// Builder method to set the split seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.split.seed = seed;
        self
    }

    /// Builder method to pin the tenure reference time
    pub fn with_reference_time(mut self, at: NaiveDateTime) -> Self {
        self.reference_time = Some(at);
        self
    }

    /// Builder method to choose what happens to unparseable profile cells
    pub fn with_malformed_profile_policy(mut self, policy: MalformedProfilePolicy) -> Self {
        self.malformed_profile = policy;
        self
    }

    /// Builder method to fix the indicator labels of an encoded column
    pub fn with_vocabulary(mut self, column: &str, labels: Vec<String>) -> Self {
        if let Some(enc) = self.encoded_columns.iter_mut().find(|c| c.column == column) {
            enc.vocabulary = Some(labels);
        }
        self
    }

    /// Check ratios and bin definitions
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("split.first_holdout", self.split.first_holdout),
            ("split.second_holdout", self.split.second_holdout),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(PrepError::InvalidParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                    reason: "must lie strictly between 0 and 1".to_string(),
                });
            }
        }
        self.salary_bins.validate()?;
        self.age_bins.validate()?;
        if self.label.is_empty() {
            return Err(PrepError::ConfigError("label column must be named".to_string()));
        }
        Ok(())
    }
}
