//! Seeded train / validation / test partitioning

use crate::error::{PrepError, Result};
use crate::utils::DataSaver;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;

use super::config::{PartitionFormat, PipelinePaths, SplitConfig};

/// One partition, already laid out for writing
#[derive(Debug, Clone)]
pub struct Partition {
    pub frame: DataFrame,
    pub include_header: bool,
}

impl Partition {
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut frame = self.frame.clone();
        DataSaver::save_csv(&mut frame, path, self.include_header)
    }
}

/// The three disjoint partitions of a model-ready table
#[derive(Debug, Clone)]
pub struct Partitions {
    pub train: Partition,
    pub validation: Partition,
    pub test: Partition,
}

impl Partitions {
    pub fn total_rows(&self) -> usize {
        self.train.height() + self.validation.height() + self.test.height()
    }

    /// Persist each partition to its own file
    pub fn write(&self, paths: &PipelinePaths) -> Result<()> {
        self.train.write(&paths.train)?;
        self.validation.write(&paths.validation)?;
        self.test.write(&paths.test)?;
        tracing::info!(
            train = %paths.train.display(),
            validation = %paths.validation.display(),
            test = %paths.test.display(),
            "wrote partitions"
        );
        Ok(())
    }
}

/// Splits rows in two shuffled stages: a holdout is taken from all rows,
/// then the holdout is split again into validation and test.
///
/// Each stage draws its permutation from a fresh `ChaCha8Rng` seeded with
/// the same seed, so a given row count always yields the same partitions.
#[derive(Debug, Clone)]
pub struct DatasetSplitter {
    config: SplitConfig,
}

impl DatasetSplitter {
    /// Create a splitter with default ratios and the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            config: SplitConfig {
                seed,
                ..SplitConfig::default()
            },
        }
    }

    pub fn with_config(config: SplitConfig) -> Self {
        Self { config }
    }

    /// Shuffle `indices` and cut off `ceil(holdout * n)` of them.
    ///
    /// Returns `(kept, held_out)`.
    fn shuffle_split(&self, mut indices: Vec<usize>, holdout: f64) -> (Vec<usize>, Vec<usize>) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        indices.shuffle(&mut rng);

        // 0.3 * 100 is 30.000000000000004 in f64; don't let that round up
        let n_holdout = ((indices.len() as f64) * holdout - 1e-9).ceil().max(0.0) as usize;
        let n_holdout = n_holdout.min(indices.len());
        let kept = indices.split_off(n_holdout);
        (kept, indices)
    }

    /// Row indices of (train, validation, test) for a table of `n_rows`
    pub fn split_indices(&self, n_rows: usize) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
        let (train, holdout) = self.shuffle_split((0..n_rows).collect(), self.config.first_holdout);
        let (validation, test) = self.shuffle_split(holdout, self.config.second_holdout);
        (train, validation, test)
    }

    /// Partition `df`, laying out each part per its [`PartitionFormat`]
    pub fn split(&self, df: &DataFrame, label: &str) -> Result<Partitions> {
        if df.column(label).is_err() {
            return Err(PrepError::FeatureNotFound(label.to_string()));
        }

        let (train, validation, test) = self.split_indices(df.height());

        tracing::info!(
            train = train.len(),
            validation = validation.len(),
            test = test.len(),
            seed = self.config.seed,
            "split dataset"
        );

        Ok(Partitions {
            train: Self::assemble(df, &train, label, self.config.train_format)?,
            validation: Self::assemble(df, &validation, label, self.config.validation_format)?,
            test: Self::assemble(df, &test, label, self.config.test_format)?,
        })
    }

    fn assemble(
        df: &DataFrame,
        rows: &[usize],
        label: &str,
        format: PartitionFormat,
    ) -> Result<Partition> {
        let idx = IdxCa::from_vec(
            "idx".into(),
            rows.iter().map(|&i| i as IdxSize).collect(),
        );
        let mut frame = df.take(&idx)?;

        if format.label_first {
            let mut order = vec![label.to_string()];
            order.extend(
                frame
                    .get_column_names()
                    .into_iter()
                    .map(|name| name.to_string())
                    .filter(|name| name != label),
            );
            frame = frame.select(order)?;
        }

        Ok(Partition {
            frame,
            include_header: format.include_header,
        })
    }
}
