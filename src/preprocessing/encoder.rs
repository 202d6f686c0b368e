//! One-hot encoding of categorical columns

use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::config::EncodedColumn;

/// Expands categorical columns into `{prefix}_{label}` indicator columns.
///
/// Without a configured vocabulary the label set is whatever the fitted
/// table contains, so two runs over different data can produce different
/// schemas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<EncodedColumn>,
    // column name -> ordered labels, in `columns` order
    categories: Vec<(String, Vec<String>)>,
    is_fitted: bool,
}

impl OneHotEncoder {
    /// Create a new encoder
    pub fn new(columns: &[EncodedColumn]) -> Self {
        Self {
            columns: columns.to_vec(),
            categories: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit the encoder to the data
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        self.categories.clear();

        for spec in &self.columns {
            let labels = match &spec.vocabulary {
                Some(vocabulary) => vocabulary.clone(),
                None => observed_labels(df, &spec.column)?,
            };
            tracing::debug!(column = %spec.column, ?labels, "fitted one-hot categories");
            self.categories.push((spec.column.clone(), labels));
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PrepError::DataError("encoder used before fit".to_string()));
        }

        let mut result = df.clone();

        for (spec, (col_name, labels)) in self.columns.iter().zip(&self.categories) {
            let values = string_values(df, col_name)?;
            let ca = values.str()?;

            let unseen = ca
                .into_iter()
                .flatten()
                .filter(|v| !labels.iter().any(|l| l == v))
                .count();
            if unseen > 0 {
                tracing::warn!(
                    column = %col_name,
                    unseen,
                    "values outside the vocabulary encode as all zeros"
                );
            }

            result = result.drop(col_name)?;

            for label in labels {
                let indicator: Vec<i32> = ca
                    .into_iter()
                    .map(|v| i32::from(v == Some(label.as_str())))
                    .collect();
                let name = format!("{}_{}", spec.prefix, label);
                result.with_column(Series::new(name.into(), indicator))?;
            }
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Labels learned for `column`
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, labels)| labels.as_slice())
    }
}

fn string_values(df: &DataFrame, column: &str) -> Result<Series> {
    let column = df
        .column(column)
        .map_err(|_| PrepError::FeatureNotFound(column.to_string()))?;
    Ok(column.as_materialized_series().cast(&DataType::String)?)
}

/// Distinct non-null labels of a column, sorted
fn observed_labels(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    let values = string_values(df, column)?;
    let distinct: BTreeSet<String> = values
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    Ok(distinct.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "bonus" => &[1.0, 2.0, 3.0, 4.0],
            "department" => &[Some("IT"), Some("HR"), Some("IT"), None]
        )
        .unwrap()
    }

    #[test]
    fn test_onehot_encoding() {
        let mut encoder = OneHotEncoder::new(&[EncodedColumn::new("department", "dept")]);
        let result = encoder.fit_transform(&sample()).unwrap();

        assert!(result.column("department").is_err());
        let names: Vec<String> = result
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["bonus", "dept_HR", "dept_IT"]);

        let it = result.column("dept_IT").unwrap().i32().unwrap();
        assert_eq!(it.into_iter().collect::<Vec<_>>(), vec![Some(1), Some(0), Some(1), Some(0)]);
        let hr = result.column("dept_HR").unwrap().i32().unwrap();
        assert_eq!(hr.get(3), Some(0));
    }

    #[test]
    fn test_labels_with_spaces_keep_them() {
        let df = df!("age_group" => &["Early Career", "Young"]).unwrap();
        let mut encoder = OneHotEncoder::new(&[EncodedColumn::new("age_group", "age")]);
        let result = encoder.fit_transform(&df).unwrap();
        assert_eq!(result.column("age_Early Career").unwrap().i32().unwrap().get(0), Some(1));
    }

    #[test]
    fn test_fixed_vocabulary() {
        let mut spec = EncodedColumn::new("department", "dept");
        spec.vocabulary = Some(vec!["IT".into(), "Sales".into()]);

        let mut encoder = OneHotEncoder::new(&[spec]);
        let result = encoder.fit_transform(&sample()).unwrap();

        assert!(result.column("dept_HR").is_err());
        assert_eq!(result.column("dept_Sales").unwrap().i32().unwrap().sum(), Some(0));
        assert_eq!(result.column("dept_IT").unwrap().i32().unwrap().sum(), Some(2));
        assert_eq!(encoder.categories("department").unwrap().len(), 2);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let mut encoder = OneHotEncoder::new(&[EncodedColumn::new("salary_category", "salary")]);
        assert!(matches!(
            encoder.fit(&sample()),
            Err(PrepError::FeatureNotFound(_))
        ));
    }
}
