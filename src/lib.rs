//! featprep - feature preparation for the bonus model
//!
//! Turns the raw employee table into model-ready train / validation / test
//! files:
//! - [`utils`] - CSV loading and saving
//! - [`preprocessing`] - imputation, profile flattening, feature derivation,
//!   one-hot encoding and splitting
//! - [`cli`] - Command-line interface
//!
//! ```no_run
//! use featprep::prelude::*;
//!
//! let pipeline = FeaturePipeline::with_config(PipelineConfig::default().with_seed(42));
//! let report = pipeline.run(&pipeline.config().paths)?;
//! println!("{} training rows", report.train_rows);
//! # Ok::<(), featprep::PrepError>(())
//! ```

// Core error handling
pub mod error;

// Pipeline stages
pub mod preprocessing;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{PrepError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{PrepError, Result};
    pub use crate::preprocessing::{
        DatasetSplitter, FeatureDeriver, FeaturePipeline, Imputer, ImputeStrategy,
        MalformedProfilePolicy, OneHotEncoder, Partitions, PipelineConfig, PipelinePaths,
        PipelineReport, ProfileFlattener,
    };
    pub use crate::utils::{DataLoader, DataSaver};
}
