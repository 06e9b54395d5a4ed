//! Shared test utilities and fixture generators
#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use hookstat::pipeline::{ingest_dataframe, AnalysisConfig, NormalizedDataset};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tempfile::TempDir;

/// Shape of a synthetic export
#[derive(Debug, Clone, Copy)]
pub struct PostFixture {
    pub accounts: usize,
    pub weeks: usize,
    pub posts_per_week: usize,
    pub seed: u64,
    /// Log-views gained per unit of `p_shock`; 0 makes every feature pure noise
    pub shock_effect: f64,
}

impl Default for PostFixture {
    fn default() -> Self {
        Self {
            accounts: 6,
            weeks: 3,
            posts_per_week: 5,
            seed: 7,
            shock_effect: 2.0,
        }
    }
}

fn timestamp(week: usize, post: usize) -> String {
    // 2024-01-01 is the Monday of ISO week 1; posts stay inside their week
    let base = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .unwrap();
    let at = base + Duration::weeks(week as i64) + Duration::hours(3 * post as i64);
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Create a DataFrame with every recognized column.
///
/// Followers differ strongly between accounts so that raw views are dominated
/// by audience size, while the normalized target follows `p_shock`.
pub fn create_post_frame(fixture: PostFixture) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(fixture.seed);

    let mut post_id = Vec::new();
    let mut account_id = Vec::new();
    let mut posted_at = Vec::new();
    let mut followers = Vec::new();
    let mut views = Vec::new();
    let mut hours = Vec::new();
    let mut engagement = Vec::new();
    let mut features: Vec<Vec<f64>> = vec![Vec::new(); 10];

    for a in 0..fixture.accounts {
        let audience = 500 + 4_000 * a as u64;
        for w in 0..fixture.weeks {
            for k in 0..fixture.posts_per_week {
                let p_shock: f64 = rng.gen();
                let age = 12.0 + rng.gen::<f64>() * 200.0;
                let noise = rng.gen::<f64>() - 0.5;
                let log_ratio = fixture.shock_effect * p_shock + noise;
                let expected = audience as f64 * log_ratio.exp() * (age + 1.0).powf(0.2);

                post_id.push(format!("acct{}_w{}_{}", a, w, k));
                account_id.push(format!("acct{}", a));
                posted_at.push(timestamp(w, k));
                followers.push(audience);
                views.push(expected.round() as u64);
                hours.push(age);
                engagement.push(0.02 + 0.1 * p_shock + 0.02 * rng.gen::<f64>());

                let row = [
                    p_shock,
                    rng.gen(),
                    rng.gen(),
                    rng.gen(),
                    rng.gen(),
                    rng.gen(),
                    rng.gen::<f64>() * 3.0,
                    rng.gen(),
                    rng.gen_range(0..6) as f64,
                    rng.gen::<f64>() * 30.0,
                ];
                for (column, value) in features.iter_mut().zip(row) {
                    column.push(value);
                }
            }
        }
    }

    let feature_names = [
        "p_shock",
        "p_humor",
        "p_relatable_slice",
        "p_question",
        "p_curiosity_gap",
        "p_tutorial",
        "payoff_time_sec",
        "face_pct_1s",
        "cuts_in_2s",
        "overlay_chars_per_sec_2s",
    ];

    let mut columns = vec![
        Column::new("post_id".into(), post_id),
        Column::new("account_id".into(), account_id),
        Column::new("posted_at".into(), posted_at),
        Column::new("followers".into(), followers),
        Column::new("views".into(), views),
        Column::new("hours_since_post".into(), hours),
        Column::new("engagement_rate".into(), engagement),
    ];
    for (name, values) in feature_names.iter().zip(features) {
        columns.push(Column::new((*name).into(), values));
    }
    DataFrame::new(columns).unwrap()
}

/// A frame with only the required columns plus the named feature columns
pub fn create_minimal_frame(
    rows: &[(&str, &str, &str, u64, u64, f64)],
    features: &[(&str, Vec<Option<f64>>)],
) -> DataFrame {
    let mut columns = vec![
        Column::new(
            "post_id".into(),
            rows.iter().map(|r| r.0).collect::<Vec<_>>(),
        ),
        Column::new(
            "account_id".into(),
            rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        ),
        Column::new(
            "posted_at".into(),
            rows.iter().map(|r| r.2).collect::<Vec<_>>(),
        ),
        Column::new(
            "followers".into(),
            rows.iter().map(|r| r.3).collect::<Vec<_>>(),
        ),
        Column::new("views".into(), rows.iter().map(|r| r.4).collect::<Vec<_>>()),
        Column::new(
            "hours_since_post".into(),
            rows.iter().map(|r| r.5).collect::<Vec<_>>(),
        ),
    ];
    for (name, values) in features {
        columns.push(Column::new((*name).into(), values.clone()));
    }
    DataFrame::new(columns).unwrap()
}

/// Ingest a frame with the given configuration, panicking on error
pub fn ingest(df: &DataFrame, config: &AnalysisConfig) -> NormalizedDataset {
    ingest_dataframe(df, config).unwrap()
}

/// Drop the named columns from a frame
pub fn without_columns(df: &DataFrame, names: &[&str]) -> DataFrame {
    let mut out = df.clone();
    for name in names {
        out = out.drop(name).unwrap();
    }
    out
}

/// Median computed independently of the crate's statistics helpers
pub fn reference_median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("posts.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("posts.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}
