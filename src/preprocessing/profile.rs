//! Flattening of the nested `profile` column

use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What to do with a row whose profile text is not a JSON object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MalformedProfilePolicy {
    /// Fail the run with [`PrepError::Parse`]
    #[default]
    Abort,
    /// Keep the row, with every projected field null
    NullFields,
    /// Remove the row from the table
    DropRow,
}

/// Parsed profile cell. Keys that are absent read as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    fields: Map<String, Value>,
}

impl Profile {
    /// Scalar value under `key` rendered as text.
    ///
    /// Strings come back verbatim, other scalars as their JSON text, and
    /// JSON `null` the same as an absent key.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parse one profile cell. A null cell yields an empty profile.
pub fn parse_profile(row: usize, cell: Option<&str>) -> Result<Profile> {
    let Some(text) = cell else {
        return Ok(Profile::default());
    };

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => Ok(Profile { fields }),
        Ok(other) => Err(PrepError::Parse {
            row,
            message: format!("expected a JSON object, found {}", json_kind(&other)),
        }),
        Err(e) => Err(PrepError::Parse {
            row,
            message: e.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Projects scalar fields out of a nested column, then drops the column
#[derive(Debug, Clone)]
pub struct ProfileFlattener {
    column: String,
    fields: Vec<String>,
    policy: MalformedProfilePolicy,
}

impl ProfileFlattener {
    pub fn new(column: impl Into<String>, fields: &[String]) -> Self {
        Self {
            column: column.into(),
            fields: fields.to_vec(),
            policy: MalformedProfilePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MalformedProfilePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let column = df
            .column(&self.column)
            .map_err(|_| PrepError::FeatureNotFound(self.column.clone()))?;
        let series = column.as_materialized_series();

        let (projected, keep) = match series.dtype() {
            DataType::Struct(_) => (self.project_struct(series)?, None),
            DataType::Null => (self.project_nulls(series.len()), None),
            _ => self.project_text(series)?,
        };

        let mut result = df.drop(&self.column)?;
        for field in projected {
            result.with_column(field)?;
        }

        if let Some(mask) = keep {
            let before = result.height();
            result = result.filter(&mask)?;
            tracing::warn!(
                dropped = before - result.height(),
                "removed rows with malformed '{}'",
                self.column
            );
        }

        Ok(result)
    }

    fn project_struct(&self, series: &Series) -> Result<Vec<Series>> {
        let nested = series.struct_()?;
        self.fields
            .iter()
            .map(|name| match nested.field_by_name(name) {
                Ok(field) => Ok(field
                    .cast(&DataType::String)?
                    .with_name(name.as_str().into())),
                Err(_) => Ok(Series::full_null(
                    name.as_str().into(),
                    series.len(),
                    &DataType::String,
                )),
            })
            .collect()
    }

    fn project_nulls(&self, len: usize) -> Vec<Series> {
        self.fields
            .iter()
            .map(|name| Series::full_null(name.as_str().into(), len, &DataType::String))
            .collect()
    }

    /// Returns the projected columns plus a row mask when rows must be dropped
    fn project_text(&self, series: &Series) -> Result<(Vec<Series>, Option<BooleanChunked>)> {
        let text = series.cast(&DataType::String)?;
        let ca = text.str()?;

        let mut values: Vec<Vec<Option<String>>> =
            vec![Vec::with_capacity(ca.len()); self.fields.len()];
        let mut keep: Vec<bool> = Vec::with_capacity(ca.len());

        for (row, cell) in ca.into_iter().enumerate() {
            let profile = match parse_profile(row, cell) {
                Ok(profile) => {
                    keep.push(true);
                    profile
                }
                Err(err) => match self.policy {
                    MalformedProfilePolicy::Abort => return Err(err),
                    MalformedProfilePolicy::NullFields => {
                        tracing::warn!("{}; projecting nulls", err);
                        keep.push(true);
                        Profile::default()
                    }
                    MalformedProfilePolicy::DropRow => {
                        tracing::warn!("{}; dropping row", err);
                        keep.push(false);
                        Profile::default()
                    }
                },
            };

            for (slot, name) in values.iter_mut().zip(&self.fields) {
                slot.push(profile.get(name));
            }
        }

        let projected = self
            .fields
            .iter()
            .zip(values)
            .map(|(name, vals)| Series::new(name.as_str().into(), vals))
            .collect();

        let mask = keep
            .iter()
            .any(|k| !k)
            .then(|| BooleanChunked::from_slice("keep".into(), &keep));

        Ok((projected, mask))
    }
}
