//! Integration tests for the individual preparation stages

use chrono::NaiveDate;
use featprep::preprocessing::{
    features, BinSpec, Binner, DatasetSplitter, EncodedColumn, FeatureDeriver, ImputeStrategy,
    Imputer, MalformedProfilePolicy, OneHotEncoder, PipelineConfig, ProfileFlattener,
};
use featprep::PrepError;
use polars::prelude::*;

fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Imputation
// ============================================================================

#[test]
fn test_median_even_count_averages_middle_pair() {
    let df = df!("salary" => &[Some(10.0), None, Some(40.0), Some(20.0), Some(30.0)]).unwrap();
    let mut imputer = Imputer::new(ImputeStrategy::Median);
    let result = imputer.fit_transform(&df, &["salary"]).unwrap();

    let salary = result.column("salary").unwrap().f64().unwrap();
    assert_eq!(salary.get(1), Some(25.0));
    assert_eq!(salary.null_count(), 0);
}

#[test]
fn test_sentinel_leaves_present_values() {
    let df = df!("department" => &[Some("IT"), None, Some("HR")]).unwrap();
    let mut imputer = Imputer::new(ImputeStrategy::ConstantString("Unknown".into()));
    let result = imputer.fit_transform(&df, &["department"]).unwrap();

    let dept: Vec<Option<&str>> = result.column("department").unwrap().str().unwrap().into_iter().collect();
    assert_eq!(dept, vec![Some("IT"), Some("Unknown"), Some("HR")]);
}

#[test]
fn test_all_null_numeric_column_fails() {
    let df = df!("age" => &[None::<f64>, None]).unwrap();
    let mut imputer = Imputer::new(ImputeStrategy::Median);
    let err = imputer.fit(&df, &["age"]).unwrap_err();
    assert!(matches!(err, PrepError::UndefinedMedian(ref c) if c == "age"));
}

// ============================================================================
// Profile flattening
// ============================================================================

#[test]
fn test_flatten_preserves_row_count_and_drops_profile() {
    let df = df!(
        "id" => &[1i64, 2, 3],
        "profile" => &[Some(r#"{"address":"1 Main","phone":"555"}"#), None, Some("{}")]
    )
    .unwrap();

    let result = ProfileFlattener::new("profile", &fields(&["address", "phone", "email"]))
        .transform(&df)
        .unwrap();

    assert_eq!(result.height(), 3);
    assert!(result.column("profile").is_err());
    assert_eq!(result.column("address").unwrap().str().unwrap().get(0), Some("1 Main"));
    assert_eq!(result.column("phone").unwrap().str().unwrap().get(1), None);
    assert_eq!(result.column("email").unwrap().null_count(), 3);
}

#[test]
fn test_flatten_policies_on_malformed_text() {
    let df = df!(
        "id" => &[1i64, 2],
        "profile" => &[Some("not json"), Some(r#"{"phone":"1"}"#)]
    )
    .unwrap();
    let flattener = ProfileFlattener::new("profile", &fields(&["phone"]));

    assert!(matches!(
        flattener.clone().transform(&df),
        Err(PrepError::Parse { row: 0, .. })
    ));

    let nulled = flattener
        .clone()
        .with_policy(MalformedProfilePolicy::NullFields)
        .transform(&df)
        .unwrap();
    assert_eq!(nulled.height(), 2);
    assert_eq!(nulled.column("phone").unwrap().str().unwrap().get(0), None);

    let dropped = flattener
        .with_policy(MalformedProfilePolicy::DropRow)
        .transform(&df)
        .unwrap();
    assert_eq!(dropped.height(), 1);
    assert_eq!(dropped.column("id").unwrap().i64().unwrap().get(0), Some(2));
}

// ============================================================================
// Feature derivation
// ============================================================================

#[test]
fn test_bin_boundaries() {
    let salary = Binner::from_spec(&BinSpec::salary());
    assert_eq!(salary.label(0.0), Some("low"));
    assert_eq!(salary.label(50_000.0), Some("low"));
    assert_eq!(salary.label(50_000.5), Some("medium"));
    assert_eq!(salary.label(100_000.0), Some("high"));
    assert_eq!(salary.label(100_001.0), None);
    assert_eq!(salary.label(-1.0), None);

    let age = Binner::from_spec(&BinSpec::age());
    assert_eq!(age.label(25.0), Some("Young"));
    assert_eq!(age.label(55.0), Some("Senior"));
    assert_eq!(age.label(90.0), Some("Experienced"));
}

#[test]
fn test_address_length_counts_null_marker() {
    let df = df!("address" => &[Some("ab"), None]).unwrap();
    let result = features::address_length(&df, "address").unwrap();
    let lengths = result.column("address_length").unwrap().i64().unwrap();
    assert_eq!(lengths.get(0), Some(2));
    assert_eq!(lengths.get(1), Some(features::NULL_MARKER.len() as i64));
}

#[test]
fn test_tenure_counts_whole_days() {
    let now = NaiveDate::from_ymd_opt(2020, 1, 2)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let df = df!("hire_date" => &[Some("2020-01-01"), Some("garbage"), Some("2019-12-30")]).unwrap();
    let result = features::tenure_days(&df, "hire_date", now).unwrap();
    let tenure = result.column("tenure_days").unwrap().f64().unwrap();
    assert_eq!(tenure.get(0), Some(1.0));
    assert_eq!(tenure.get(2), Some(3.0));
    // unparseable dates take the median of the parsed ones
    assert_eq!(tenure.get(1), Some(2.0));
}

#[test]
fn test_deriver_drops_rows_without_label() {
    let at = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let config = PipelineConfig::default().with_reference_time(at);
    let df = df!(
        "id" => &[1i64, 2],
        "age" => &[30.0, 40.0],
        "salary" => &[60_000.0, 80_000.0],
        "department" => &["IT", "HR"],
        "hire_date" => &["2020-01-01", "2021-01-01"],
        "bonus" => &[Some(100.0), None],
        "name" => &["A", "B"],
        "address" => &[Some("x"), None],
        "phone" => &[None::<&str>, None],
        "email" => &[None::<&str>, None]
    )
    .unwrap();

    let result = FeatureDeriver::from_config(&config).transform(&df).unwrap();
    assert_eq!(result.height(), 1);
    assert_eq!(result.column("bonus").unwrap().null_count(), 0);
    assert_eq!(result.column("salary_category").unwrap().str().unwrap().get(0), Some("medium"));
}

// ============================================================================
// Encoding and splitting
// ============================================================================

#[test]
fn test_encoder_one_indicator_per_row() {
    let df = df!("department" => &["IT", "HR", "Sales", "IT"]).unwrap();
    let mut encoder = OneHotEncoder::new(&[EncodedColumn::new("department", "dept")]);
    let result = encoder.fit_transform(&df).unwrap();

    assert_eq!(encoder.categories("department").unwrap(), ["HR", "IT", "Sales"]);
    for row in 0..result.height() {
        let hot: i32 = ["dept_HR", "dept_IT", "dept_Sales"]
            .iter()
            .map(|c| result.column(c).unwrap().i32().unwrap().get(row).unwrap())
            .sum();
        assert_eq!(hot, 1);
    }
}

#[test]
fn test_split_small_tables() {
    let (train, validation, test) = DatasetSplitter::new(42).split_indices(1);
    assert_eq!((train.len(), validation.len(), test.len()), (0, 0, 1));

    let (train, validation, test) = DatasetSplitter::new(42).split_indices(10);
    assert_eq!((train.len(), validation.len(), test.len()), (7, 2, 1));
}
