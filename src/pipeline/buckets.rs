//! Editor-facing threshold rules
//!
//! A rule's lift is the median normalized target of the records satisfying it
//! minus the median over every eligible record (those with all of the rule's
//! features present). Both medians are in the log units of the target.

use serde::Serialize;

use super::config::{AnalysisConfig, BucketRule, Condition};
use super::dataset::NormalizedDataset;
use super::outcome::{Outcome, SkipReason};
use super::stats::{mann_whitney_p_value, median};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketStat {
    pub n_bucket: usize,
    pub n_total: usize,
    pub bucket_median: f64,
    pub overall_median: f64,
    pub lift: f64,
    /// Share of bucket records above the overall median
    pub win_rate: f64,
    /// Mann-Whitney test of bucket vs the other eligible records
    pub p_value: Option<f64>,
    pub low_confidence: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketRuleResult {
    pub label: String,
    pub description: String,
    #[serde(flatten)]
    pub outcome: Outcome<BucketStat>,
}

pub fn evaluate_rule(
    rule: &BucketRule,
    dataset: &NormalizedDataset,
    config: &AnalysisConfig,
) -> Outcome<BucketStat> {
    let missing = dataset.features().missing_of(rule.features());
    if !missing.is_empty() {
        return Outcome::Skipped(SkipReason::ColumnNotFound { columns: missing });
    }

    let conditions: Vec<(usize, &Condition)> = rule
        .conditions
        .iter()
        .filter_map(|c| dataset.features().index_of(&c.feature).map(|idx| (idx, c)))
        .collect();

    let mut inside = Vec::new();
    let mut outside = Vec::new();
    for (record, &y) in dataset.records().iter().zip(dataset.y_norm()) {
        let mut satisfied = true;
        let mut eligible = true;
        for (idx, condition) in &conditions {
            match record.features[*idx] {
                Some(value) => satisfied &= condition.op.holds(value, condition.threshold),
                None => eligible = false,
            }
        }
        if !eligible {
            continue;
        }
        if satisfied {
            inside.push(y);
        } else {
            outside.push(y);
        }
    }

    let n_total = inside.len() + outside.len();
    if n_total == 0 {
        return Outcome::Skipped(SkipReason::InsufficientData {
            available: 0,
            required: 1,
        });
    }
    if inside.is_empty() {
        return Outcome::Skipped(SkipReason::NoSignal {
            detail: format!("no record satisfies {}", rule.describe()),
        });
    }

    let all: Vec<f64> = inside.iter().chain(&outside).copied().collect();
    let (Some(bucket_median), Some(overall_median)) = (median(&inside), median(&all)) else {
        return Outcome::Skipped(SkipReason::InsufficientData {
            available: n_total,
            required: 1,
        });
    };
    let wins = inside.iter().filter(|&&y| y > overall_median).count();

    Outcome::Computed(BucketStat {
        n_bucket: inside.len(),
        n_total,
        bucket_median,
        overall_median,
        lift: bucket_median - overall_median,
        win_rate: wins as f64 / inside.len() as f64,
        p_value: mann_whitney_p_value(&inside, &outside),
        low_confidence: inside.len() < config.min_bucket_samples,
    })
}

/// Evaluate every configured rule, in configuration order
pub fn analyze_buckets(
    dataset: &NormalizedDataset,
    config: &AnalysisConfig,
) -> Vec<BucketRuleResult> {
    config
        .bucket_rules
        .iter()
        .map(|rule| BucketRuleResult {
            label: rule.label.clone(),
            description: rule.describe(),
            outcome: evaluate_rule(rule, dataset, config),
        })
        .collect()
}
