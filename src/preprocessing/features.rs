//! Derived features: address length, salary and age buckets, tenure

use crate::error::{PrepError, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use super::config::PipelineConfig;
use super::imputer::column_median;
use super::transforms::Binner;

/// Text a null cell is measured as when computing string lengths
pub const NULL_MARKER: &str = "null";

const SECONDS_PER_DAY: i64 = 86_400;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Computes every derived column and removes the columns they consumed.
///
/// Steps run in a fixed order: address length, salary category, age group,
/// label-null drop, tenure, column drop. Bucketing is per row, so running it
/// ahead of the label filter does not change any surviving row.
#[derive(Debug, Clone)]
pub struct FeatureDeriver {
    address_column: String,
    salary: Binner,
    age: Binner,
    label: String,
    hire_date_column: String,
    reference_time: NaiveDateTime,
    drop_columns: Vec<String>,
}

impl FeatureDeriver {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            address_column: config.address_column.clone(),
            salary: Binner::from_spec(&config.salary_bins),
            age: Binner::from_spec(&config.age_bins),
            label: config.label.clone(),
            hire_date_column: config.hire_date_column.clone(),
            reference_time: config
                .reference_time
                .unwrap_or_else(|| Local::now().naive_local()),
            drop_columns: config.drop_columns.clone(),
        }
    }

    pub fn reference_time(&self) -> NaiveDateTime {
        self.reference_time
    }

    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let df = address_length(df, &self.address_column)?;
        let df = self.salary.transform(&df)?;
        let df = self.age.transform(&df)?;
        let df = drop_missing_label(&df, &self.label)?;
        let df = tenure_days(&df, &self.hire_date_column, self.reference_time)?;
        self.drop_consumed(&df)
    }

    fn drop_consumed(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();
        for name in &self.drop_columns {
            if result.column(name).is_ok() {
                result = result.drop(name)?;
            }
        }
        tracing::debug!(columns = ?result.get_column_names(), "dropped consumed columns");
        Ok(result)
    }
}

/// Add `address_length`: character count of the stringified address
pub fn address_length(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let address = df
        .column(column)
        .map_err(|_| PrepError::FeatureNotFound(column.to_string()))?
        .as_materialized_series()
        .cast(&DataType::String)?;

    let lengths: Vec<i64> = address
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or(NULL_MARKER).chars().count() as i64)
        .collect();

    let mut result = df.clone();
    result.with_column(Series::new("address_length".into(), lengths))?;
    Ok(result)
}

/// Remove every row whose label is null
pub fn drop_missing_label(df: &DataFrame, label: &str) -> Result<DataFrame> {
    let mask = df
        .column(label)
        .map_err(|_| PrepError::FeatureNotFound(label.to_string()))?
        .as_materialized_series()
        .is_not_null();

    let result = df.filter(&mask)?;
    tracing::info!(
        dropped = df.height() - result.height(),
        remaining = result.height(),
        "removed rows without '{}'",
        label
    );
    Ok(result)
}

/// Parse a hire date; anything unrecognised yields `None`
pub fn parse_hire_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

/// Whole days from `hire` to `now`, rounded toward negative infinity
pub fn elapsed_days(hire: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (now - hire).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Add `tenure_days`, filling unparseable dates with the median tenure
pub fn tenure_days(df: &DataFrame, column: &str, now: NaiveDateTime) -> Result<DataFrame> {
    let dates = df
        .column(column)
        .map_err(|_| PrepError::FeatureNotFound(column.to_string()))?
        .as_materialized_series()
        .cast(&DataType::String)?;

    let tenure: Float64Chunked = dates
        .str()?
        .into_iter()
        .map(|v| {
            v.and_then(parse_hire_date)
                .map(|hired| elapsed_days(hired, now) as f64)
        })
        .collect();
    let tenure = tenure.with_name("tenure_days".into()).into_series();

    let unparsed = tenure.null_count();
    let tenure = if unparsed > 0 {
        let median = column_median(&tenure)?
            .ok_or_else(|| PrepError::UndefinedMedian("tenure_days".to_string()))?;
        tracing::info!(unparsed, median, "filled tenure for unparseable hire dates");
        let filled: Float64Chunked = tenure
            .f64()?
            .into_iter()
            .map(|v| Some(v.unwrap_or(median)))
            .collect();
        filled.with_name("tenure_days".into()).into_series()
    } else {
        tenure
    };

    let mut result = df.clone();
    result.with_column(tenure)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_address_length_counts_null_marker() {
        let df = df!("address" => &[Some("12 Elm"), None, Some("Ünïcode")]).unwrap();
        let result = address_length(&df, "address").unwrap();
        let lengths = result.column("address_length").unwrap().i64().unwrap();
        assert_eq!(lengths.get(0), Some(6));
        assert_eq!(lengths.get(1), Some(4));
        assert_eq!(lengths.get(2), Some(7));
    }

    #[test]
    fn test_drop_missing_label() {
        let df = df!(
            "id" => &[1i64, 2, 3],
            "bonus" => &[Some(100.0), None, Some(300.0)]
        )
        .unwrap();
        let result = drop_missing_label(&df, "bonus").unwrap();
        assert_eq!(result.height(), 2);
        assert_eq!(result.column("bonus").unwrap().null_count(), 0);
    }

    #[test]
    fn test_parse_hire_date_formats() {
        assert_eq!(parse_hire_date("2020-01-01"), Some(at(2020, 1, 1)));
        assert_eq!(parse_hire_date("2020/01/01"), Some(at(2020, 1, 1)));
        assert_eq!(parse_hire_date("01/02/2020"), Some(at(2020, 1, 2)));
        assert_eq!(
            parse_hire_date("2020-01-01 12:00:00"),
            at(2020, 1, 1).checked_add_signed(chrono::Duration::hours(12))
        );
        assert_eq!(parse_hire_date("2020-01-01T00:00:00Z"), Some(at(2020, 1, 1)));
        assert_eq!(parse_hire_date("not a date"), None);
        assert_eq!(parse_hire_date("2020-02-30"), None);
    }

    #[test]
    fn test_elapsed_days_floors() {
        let now = at(2020, 1, 11);
        assert_eq!(elapsed_days(at(2020, 1, 1), now), 10);
        let half_day_later = now.checked_add_signed(chrono::Duration::hours(12)).unwrap();
        assert_eq!(elapsed_days(at(2020, 1, 1), half_day_later), 10);
        assert_eq!(elapsed_days(half_day_later, now), -1);
    }

    #[test]
    fn test_tenure_fills_unparseable_with_median() {
        let df = df!(
            "hire_date" => &[Some("2020-01-01"), Some("garbage"), Some("2019-12-22"), None]
        )
        .unwrap();
        let result = tenure_days(&df, "hire_date", at(2020, 1, 11)).unwrap();
        let tenure = result.column("tenure_days").unwrap().f64().unwrap();

        assert_eq!(tenure.get(0), Some(10.0));
        assert_eq!(tenure.get(2), Some(20.0));
        assert_eq!(tenure.get(1), Some(15.0));
        assert_eq!(tenure.get(3), Some(15.0));
    }

    #[test]
    fn test_tenure_without_any_date_is_undefined() {
        let df = df!("hire_date" => &["soon", "later"]).unwrap();
        let err = tenure_days(&df, "hire_date", at(2020, 1, 1)).unwrap_err();
        assert!(matches!(err, PrepError::UndefinedMedian(_)));
    }

    #[test]
    fn test_deriver_drops_consumed_columns() {
        let df = df!(
            "id" => &[1i64, 2],
            "name" => &["A", "B"],
            "age" => &[30.0, 60.0],
            "salary" => &[60_000.0, 90_000.0],
            "hire_date" => &["2020-01-01", "2010-06-15"],
            "bonus" => &[Some(1000.0), None],
            "address" => &[None, Some("1 Main St")],
            "phone" => &[Some("555"), None],
            "email" => &[None::<&str>, None]
        )
        .unwrap();

        let config = PipelineConfig::default().with_reference_time(at(2020, 1, 11));
        let result = FeatureDeriver::from_config(&config).transform(&df).unwrap();

        assert_eq!(result.height(), 1);
        for gone in ["id", "name", "hire_date", "address", "phone", "email"] {
            assert!(result.column(gone).is_err(), "{gone} should be dropped");
        }
        assert_eq!(result.column("address_length").unwrap().i64().unwrap().get(0), Some(4));
        assert_eq!(result.column("salary_category").unwrap().str().unwrap().get(0), Some("medium"));
        assert_eq!(result.column("age_group").unwrap().str().unwrap().get(0), Some("Early Career"));
        assert_eq!(result.column("tenure_days").unwrap().f64().unwrap().get(0), Some(10.0));
    }
}
