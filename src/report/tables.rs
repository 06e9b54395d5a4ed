//! Structured JSON tables, one per analyzer
//!
//! Every table carries the same metadata block (run timestamp, version, input
//! and parameters) so a table copied out of its directory stays interpretable.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::pipeline::normalize::{ScaleCorrection, WinsorBounds};
use crate::pipeline::{
    AnalysisConfig, AnalysisResults, BucketRuleResult, InteractionResult, NormalizedDataset,
    RankingModelResult, TargetMode, UnivariateResult,
};

/// Parameters that influence the numbers in the tables
#[derive(Debug, Clone, Serialize)]
pub struct RunParameters {
    pub target_mode: TargetMode,
    pub decay_beta: f64,
    pub winsor_lower_pct: f64,
    pub winsor_upper_pct: f64,
    pub min_samples: usize,
    pub min_pairs: usize,
    pub min_bucket_samples: usize,
    pub cv_folds: usize,
    pub seed: u64,
    pub l2_penalty: f64,
}

impl From<&AnalysisConfig> for RunParameters {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            target_mode: config.target_mode,
            decay_beta: config.decay_beta,
            winsor_lower_pct: config.winsor_lower_pct,
            winsor_upper_pct: config.winsor_upper_pct,
            min_samples: config.min_samples,
            min_pairs: config.min_pairs,
            min_bucket_samples: config.min_bucket_samples,
            cv_folds: config.cv_folds,
            seed: config.seed,
            l2_penalty: config.l2_penalty,
        }
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub hookstat_version: String,
    pub input_file: String,
    pub parameters: RunParameters,
}

impl ReportMetadata {
    pub fn new(input: &Path, config: &AnalysisConfig, timestamp: String) -> Self {
        Self {
            timestamp,
            hookstat_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: input.display().to_string(),
            parameters: RunParameters::from(config),
        }
    }
}

/// What went into the analysis
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub rows_read: usize,
    pub rows_analyzed: usize,
    pub rows_dropped: usize,
    pub accounts: usize,
    pub weeks: usize,
    pub features_available: Vec<String>,
    pub features_unavailable: Vec<String>,
    pub winsorization: WinsorBounds,
    pub scale_corrections: Vec<ScaleCorrection>,
}

impl DatasetSummary {
    pub fn from_dataset(dataset: &NormalizedDataset) -> Self {
        let notes = dataset.notes();
        Self {
            rows_read: notes.rows_read,
            rows_analyzed: dataset.len(),
            rows_dropped: notes.rows_dropped,
            accounts: dataset.account_count(),
            weeks: dataset.week_count(),
            features_available: dataset.features().available().to_vec(),
            features_unavailable: dataset.features().unavailable().to_vec(),
            winsorization: *dataset.winsor(),
            scale_corrections: notes.scale_corrections.clone(),
        }
    }
}

#[derive(Serialize)]
struct Table<'a, T: Serialize> {
    metadata: &'a ReportMetadata,
    dataset: &'a DatasetSummary,
    results: T,
}

fn to_json<T: Serialize>(
    metadata: &ReportMetadata,
    dataset: &DatasetSummary,
    results: T,
    name: &str,
) -> Result<String> {
    let table = Table {
        metadata,
        dataset,
        results,
    };
    serde_json::to_string_pretty(&table).with_context(|| format!("Failed to serialize {}", name))
}

pub fn univariate_json(
    metadata: &ReportMetadata,
    dataset: &DatasetSummary,
    results: &[UnivariateResult],
) -> Result<String> {
    to_json(metadata, dataset, results, "univariate table")
}

pub fn pairwise_json(
    metadata: &ReportMetadata,
    dataset: &DatasetSummary,
    result: &RankingModelResult,
) -> Result<String> {
    to_json(metadata, dataset, result, "pairwise model table")
}

pub fn interactions_json(
    metadata: &ReportMetadata,
    dataset: &DatasetSummary,
    results: &[InteractionResult],
) -> Result<String> {
    to_json(metadata, dataset, results, "interaction table")
}

pub fn buckets_json(
    metadata: &ReportMetadata,
    dataset: &DatasetSummary,
    results: &[BucketRuleResult],
) -> Result<String> {
    to_json(metadata, dataset, results, "bucket table")
}

/// All four tables as `(file name, contents)`
pub fn render_tables(
    metadata: &ReportMetadata,
    dataset: &DatasetSummary,
    results: &AnalysisResults,
) -> Result<Vec<(&'static str, String)>> {
    Ok(vec![
        (
            "univariate.json",
            univariate_json(metadata, dataset, &results.univariate)?,
        ),
        (
            "pairwise_model.json",
            pairwise_json(metadata, dataset, &results.pairwise)?,
        ),
        (
            "interactions.json",
            interactions_json(metadata, dataset, &results.interactions)?,
        ),
        (
            "buckets.json",
            buckets_json(metadata, dataset, &results.buckets)?,
        ),
    ])
}
