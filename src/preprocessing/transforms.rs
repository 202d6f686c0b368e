//! Binning / discretization of numeric columns into labelled categories

use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::BinSpec;

/// Feature binner with fixed edges and one label per interval.
///
/// Intervals are right-closed. Values outside every interval, and nulls,
/// bin to null rather than being clipped into the outer bins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binner {
    source: String,
    target: String,
    edges: Vec<f64>,
    labels: Vec<String>,
    include_lowest: bool,
    open_ended: bool,
}

impl Binner {
    pub fn from_spec(spec: &BinSpec) -> Self {
        Self {
            source: spec.source.clone(),
            target: spec.target.clone(),
            edges: spec.edges.clone(),
            labels: spec.labels.clone(),
            include_lowest: spec.include_lowest,
            open_ended: spec.open_ended,
        }
    }

    /// Index of the interval containing `value`
    pub fn find_bin(&self, value: f64) -> Option<usize> {
        if value.is_nan() {
            return None;
        }
        let first = *self.edges.first()?;
        if self.include_lowest && value == first {
            return Some(0);
        }

        if let Some(i) = self
            .edges
            .windows(2)
            .position(|w| value > w[0] && value <= w[1])
        {
            return Some(i);
        }

        let last = *self.edges.last()?;
        (self.open_ended && value > last).then(|| self.edges.len() - 1)
    }

    /// Label of the interval containing `value`
    pub fn label(&self, value: f64) -> Option<&str> {
        self.find_bin(value)
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
    }

    /// Add the labelled column next to the source column's values
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let column = df
            .column(&self.source)
            .map_err(|_| PrepError::FeatureNotFound(self.source.clone()))?;
        let values = column.as_materialized_series().cast(&DataType::Float64)?;

        let binned: StringChunked = values
            .f64()?
            .into_iter()
            .map(|v| v.and_then(|x| self.label(x)))
            .collect();

        let mut result = df.clone();
        result.with_column(binned.with_name(self.target.as_str().into()).into_series())?;

        tracing::debug!(
            source = %self.source,
            target = %self.target,
            unbinned = result.column(&self.target)?.null_count(),
            "binned column"
        );

        Ok(result)
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salary_boundaries() {
        let binner = Binner::from_spec(&BinSpec::salary());
        assert_eq!(binner.label(0.0), Some("low"));
        assert_eq!(binner.label(50_000.0), Some("low"));
        assert_eq!(binner.label(50_001.0), Some("medium"));
        assert_eq!(binner.label(70_000.0), Some("medium"));
        assert_eq!(binner.label(70_001.0), Some("high"));
        assert_eq!(binner.label(100_000.0), Some("high"));
    }

    #[test]
    fn test_salary_out_of_range_is_unbinned() {
        let binner = Binner::from_spec(&BinSpec::salary());
        assert_eq!(binner.label(-1.0), None);
        assert_eq!(binner.label(100_001.0), None);
        assert_eq!(binner.label(f64::NAN), None);
    }

    #[test]
    fn test_age_boundaries() {
        let binner = Binner::from_spec(&BinSpec::age());
        assert_eq!(binner.label(0.0), Some("Young"));
        assert_eq!(binner.label(25.0), Some("Young"));
        assert_eq!(binner.label(26.0), Some("Early Career"));
        assert_eq!(binner.label(35.0), Some("Early Career"));
        assert_eq!(binner.label(45.5), Some("Senior"));
        assert_eq!(binner.label(55.0), Some("Senior"));
        assert_eq!(binner.label(100.0), Some("Experienced"));
    }

    #[test]
    fn test_without_include_lowest_first_edge_is_excluded() {
        let mut spec = BinSpec::salary();
        spec.include_lowest = false;
        let binner = Binner::from_spec(&spec);
        assert_eq!(binner.label(0.0), None);
        assert_eq!(binner.label(0.5), Some("low"));
    }

    #[test]
    fn test_transform_adds_label_column() {
        let df = df!(
            "salary" => &[Some(30_000.0), None, Some(60_000.0), Some(250_000.0)]
        )
        .unwrap();

        let result = Binner::from_spec(&BinSpec::salary()).transform(&df).unwrap();
        let labels = result.column("salary_category").unwrap().str().unwrap();

        assert_eq!(labels.get(0), Some("low"));
        assert_eq!(labels.get(1), None);
        assert_eq!(labels.get(2), Some("medium"));
        assert_eq!(labels.get(3), None);
        assert!(result.column("salary").is_ok());
    }

    #[test]
    fn test_transform_accepts_integer_source() {
        let df = df!("age" => &[22i64, 40, 61]).unwrap();
        let result = Binner::from_spec(&BinSpec::age()).transform(&df).unwrap();
        let labels = result.column("age_group").unwrap().str().unwrap();
        assert_eq!(labels.get(1), Some("Mid Career"));
        assert_eq!(labels.get(2), Some("Experienced"));
    }
}
