//! Dataset loader for CSV and Parquet exports
//!
//! Columns are resolved by name through the configured alias map, never by
//! position, so the column order of the export does not matter.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use super::config::{
    AnalysisConfig, ACCOUNT_ID, ENGAGEMENT_RATE, FOLLOWERS, HOURS_SINCE_POST, POSTED_AT, POST_ID,
    REQUIRED_COLUMNS, VIEWS,
};
use super::dataset::{FeatureSet, IngestNotes, NormalizedDataset, PerformanceRecord};
use super::error::IngestError;
use crate::utils::{create_spinner, finish_with_success};

/// Load a dataset from a file (CSV or Parquet based on extension)
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    // 0 means full table scan
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => return Err(IngestError::UnsupportedFormat { extension }.into()),
    };

    lf.collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))
}

/// Load a dataset behind a spinner, returning (frame, rows, columns, memory MB)
pub fn load_dataset_with_progress(
    path: &Path,
    infer_schema_length: usize,
) -> Result<(DataFrame, usize, usize, f64)> {
    let spinner = create_spinner("Loading dataset...");
    let df = match load_dataset(path, infer_schema_length) {
        Ok(df) => df,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };
    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
    finish_with_success(&spinner, &format!("Loaded {} rows × {} columns", rows, cols));
    Ok((df, rows, cols, memory_mb))
}

/// Map each canonical column to the input column it is read from.
///
/// Matching is case-insensitive on trimmed names; the canonical name wins over
/// aliases, and aliases are tried in configuration order.
pub fn resolve_columns(columns: &[String], config: &AnalysisConfig) -> BTreeMap<String, String> {
    let lookup: HashMap<String, &String> = columns
        .iter()
        .map(|c| (c.trim().to_lowercase(), c))
        .collect();

    let canonical_names = REQUIRED_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(ENGAGEMENT_RATE))
        .chain(config.recognized_features());

    let mut resolved = BTreeMap::new();
    for canonical in canonical_names {
        let found = config
            .column_candidates(canonical)
            .into_iter()
            .find_map(|candidate| lookup.get(&candidate.to_lowercase()));
        if let Some(actual) = found {
            resolved.insert(canonical.to_string(), (*actual).clone());
        }
    }
    resolved
}

/// Read, validate and normalize a file into an analysis-ready dataset
pub fn ingest_file(
    path: &Path,
    config: &AnalysisConfig,
    infer_schema_length: usize,
) -> Result<NormalizedDataset> {
    let df = load_dataset(path, infer_schema_length)?;
    ingest_dataframe(&df, config)
}

/// Validate and normalize an already loaded frame
pub fn ingest_dataframe(df: &DataFrame, config: &AnalysisConfig) -> Result<NormalizedDataset> {
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let column_map = resolve_columns(&columns, config);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| !column_map.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns {
            missing,
            available: columns,
        }
        .into());
    }

    if df.height() == 0 {
        return Err(IngestError::EmptyDataset {
            detail: "the input has a header but no rows".to_string(),
        }
        .into());
    }

    let features = FeatureSet::from_config(config, |name| column_map.contains_key(name));
    let records = read_records(df, &column_map, &features)?;

    let notes = IngestNotes {
        rows_read: df.height(),
        rows_dropped: 0,
        column_map,
        scale_corrections: Vec::new(),
    };
    Ok(NormalizedDataset::from_records(
        records, features, config, notes,
    )?)
}

fn read_records(
    df: &DataFrame,
    column_map: &BTreeMap<String, String>,
    features: &FeatureSet,
) -> Result<Vec<PerformanceRecord>> {
    // Required columns are present: checked by the caller
    let source = |canonical: &str| column_map[canonical].as_str();

    let post_ids = string_column(df, source(POST_ID))?;
    let account_ids = string_column(df, source(ACCOUNT_ID))?;
    let posted_at = string_column(df, source(POSTED_AT))?;
    let followers = float_column(df, source(FOLLOWERS))?;
    let views = float_column(df, source(VIEWS))?;
    let hours = float_column(df, source(HOURS_SINCE_POST))?;
    let engagement = match column_map.get(ENGAGEMENT_RATE) {
        Some(name) => float_column(df, name)?,
        None => vec![None; df.height()],
    };
    let feature_columns: Vec<Vec<Option<f64>>> = features
        .available()
        .iter()
        .map(|name| float_column(df, &column_map[name]))
        .collect::<Result<_>>()?;

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut records = Vec::with_capacity(df.height());

    for row in 0..df.height() {
        let row_number = row + 1;

        let post_id = required_text(&post_ids[row], POST_ID, row_number)?;
        if let Some(&first_row) = seen.get(&post_id) {
            return Err(IngestError::DuplicatePostId {
                post_id,
                first_row,
                second_row: row_number,
            }
            .into());
        }
        seen.insert(post_id.clone(), row_number);

        let account_id = required_text(&account_ids[row], ACCOUNT_ID, row_number)?;
        let posted_text = required_text(&posted_at[row], POSTED_AT, row_number)?;
        let posted_at = parse_timestamp(&posted_text).ok_or_else(|| IngestError::InvalidValue {
            column: POSTED_AT.to_string(),
            row: row_number,
            detail: format!("'{}' is not an ISO-8601 timestamp", posted_text),
        })?;

        let followers = required_non_negative(followers[row], FOLLOWERS, row_number)?;
        let views = required_non_negative(views[row], VIEWS, row_number)?;
        let hours_since_post = required_non_negative(hours[row], HOURS_SINCE_POST, row_number)?;

        let engagement_rate = match engagement[row] {
            Some(er) if er < 0.0 => {
                return Err(IngestError::InvalidValue {
                    column: ENGAGEMENT_RATE.to_string(),
                    row: row_number,
                    detail: format!("negative engagement rate {}", er),
                }
                .into())
            }
            other => other,
        };

        records.push(PerformanceRecord {
            post_id,
            account_id,
            posted_at,
            followers: followers.round() as u64,
            views: views.round() as u64,
            hours_since_post,
            engagement_rate,
            features: feature_columns.iter().map(|col| col[row]).collect(),
        });
    }

    Ok(records)
}

/// Read a column as text; numeric identifiers are rendered as strings
fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .with_context(|| format!("Column '{}' not found", name))?;
    let casted = column
        .cast(&DataType::String)
        .with_context(|| format!("Column '{}' cannot be read as text", name))?;
    let ca = casted.str()?;
    Ok(ca
        .iter()
        .map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
        .collect())
}

/// Read a column as Float64; unparseable cells and NaN become missing
fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .with_context(|| format!("Column '{}' not found", name))?;
    let casted = column
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' must be numeric", name))?;
    let ca = casted.f64()?;
    Ok(ca.iter().map(|v| v.filter(|x| x.is_finite())).collect())
}

fn required_text(value: &Option<String>, column: &str, row: usize) -> Result<String> {
    value.clone().ok_or_else(|| {
        IngestError::InvalidValue {
            column: column.to_string(),
            row,
            detail: "missing value".to_string(),
        }
        .into()
    })
}

fn required_non_negative(value: Option<f64>, column: &str, row: usize) -> Result<f64> {
    match value {
        Some(v) if v >= 0.0 => Ok(v),
        Some(v) => Err(IngestError::InvalidValue {
            column: column.to_string(),
            row,
            detail: format!("negative value {}", v),
        }
        .into()),
        None => Err(IngestError::InvalidValue {
            column: column.to_string(),
            row,
            detail: "missing or non-numeric value".to_string(),
        }
        .into()),
    }
}

/// Parse ISO-8601 timestamps with or without offset, or bare dates.
/// Offset timestamps are converted to UTC.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 30, 0))
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-01T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T10:30:00.000"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T10:30"), Some(expected));
        assert!(parse_timestamp("2024-03-01").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_resolve_columns_prefers_canonical_and_ignores_case() {
        let config = AnalysisConfig::default();
        let columns: Vec<String> = ["Post_ID", "view_count", "views", "Shock_Prob"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let resolved = resolve_columns(&columns, &config);
        assert_eq!(resolved["post_id"], "Post_ID");
        assert_eq!(resolved["views"], "views");
        assert_eq!(resolved["p_shock"], "Shock_Prob");
        assert!(!resolved.contains_key("followers"));
    }
}
