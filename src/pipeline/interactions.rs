//! Named composite-feature tests
//!
//! Each configured interaction combines two or more base features into a single
//! value per record and is then correlated with the target exactly like a
//! univariate feature.

use serde::Serialize;

use super::config::{AnalysisConfig, InteractionSpec};
use super::dataset::NormalizedDataset;
use super::outcome::{Evaluated, Outcome, SkipReason};
use super::univariate::{correlate, sort_by_strength, CorrelationStat};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionResult {
    pub label: String,
    pub description: String,
    #[serde(flatten)]
    pub outcome: Outcome<CorrelationStat>,
}

/// Combined value of the interaction for every record, or the missing columns
pub fn interaction_values(
    spec: &InteractionSpec,
    dataset: &NormalizedDataset,
) -> Result<Vec<Option<f64>>, Vec<String>> {
    let features = spec.combine.features();
    let missing = dataset.features().missing_of(features.iter().copied());
    if !missing.is_empty() {
        return Err(missing);
    }

    let indices: Vec<usize> = features
        .iter()
        .filter_map(|f| dataset.features().index_of(f))
        .collect();
    Ok(dataset
        .records()
        .iter()
        .map(|record| {
            let inputs: Vec<Option<f64>> = indices.iter().map(|&i| record.features[i]).collect();
            spec.combine.evaluate(&inputs)
        })
        .collect())
}

pub fn analyze_interactions(
    dataset: &NormalizedDataset,
    config: &AnalysisConfig,
) -> Vec<InteractionResult> {
    // Correlate under the label, then reattach descriptions after sorting
    let family_size = config.interactions.len();
    let mut tests: Vec<Evaluated<CorrelationStat>> = config
        .interactions
        .iter()
        .map(|spec| match interaction_values(spec, dataset) {
            Ok(values) => Evaluated::new(
                spec.label.as_str(),
                correlate(&values, dataset.y_norm(), config.min_samples, family_size),
            ),
            Err(columns) => {
                Evaluated::skipped(spec.label.as_str(), SkipReason::ColumnNotFound { columns })
            }
        })
        .collect();

    sort_by_strength(&mut tests);

    tests
        .into_iter()
        .map(|test| {
            let description = config
                .interactions
                .iter()
                .find(|spec| spec.label == test.name)
                .map(|spec| spec.combine.describe())
                .unwrap_or_default();
            InteractionResult {
                label: test.name,
                description,
                outcome: test.outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::config::{Combine, Comparison, Condition};
    use crate::pipeline::dataset::{FeatureSet, IngestNotes, PerformanceRecord};
    use chrono::NaiveDate;

    fn dataset(n: usize) -> NormalizedDataset {
        let records: Vec<PerformanceRecord> = (0..n)
            .map(|i| PerformanceRecord {
                post_id: format!("p{}", i),
                account_id: "a".to_string(),
                posted_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .unwrap(),
                followers: 100,
                views: 100 + 10 * i as u64,
                hours_since_post: 24.0,
                engagement_rate: None,
                features: vec![Some(i as f64 / n as f64), Some((i % 3) as f64)],
            })
            .collect();
        let features = FeatureSet::new(
            vec!["p_shock".to_string(), "payoff_time_sec".to_string()],
            vec!["face_pct_1s".to_string()],
        );
        NormalizedDataset::from_records(
            records,
            features,
            &AnalysisConfig::default(),
            IngestNotes::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_gated_interaction_only_counts_open_gate() {
        let data = dataset(60);
        let spec = InteractionSpec {
            label: "shock fast".to_string(),
            combine: Combine::Gated {
                feature: "p_shock".to_string(),
                gate: Condition::new("payoff_time_sec", Comparison::Le, 1.0),
            },
        };
        let values = interaction_values(&spec, &data).unwrap();
        assert_eq!(values.iter().filter(|v| v.is_some()).count(), 40);
    }

    #[test]
    fn test_missing_constituent_is_column_not_found() {
        let config = AnalysisConfig {
            interactions: vec![InteractionSpec {
                label: "humor on camera".to_string(),
                combine: Combine::Product {
                    features: vec!["p_shock".to_string(), "face_pct_1s".to_string()],
                },
            }],
            ..Default::default()
        };
        let results = analyze_interactions(&dataset(30), &config);
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].outcome.skip_reason(),
            Some(&SkipReason::ColumnNotFound {
                columns: vec!["face_pct_1s".to_string()]
            })
        );
        assert_eq!(results[0].description, "p_shock × face_pct_1s");
    }

    #[test]
    fn test_product_interaction_computed() {
        let config = AnalysisConfig {
            interactions: vec![InteractionSpec {
                label: "shock times payoff".to_string(),
                combine: Combine::Product {
                    features: vec!["p_shock".to_string(), "payoff_time_sec".to_string()],
                },
            }],
            ..Default::default()
        };
        let results = analyze_interactions(&dataset(60), &config);
        let stat = results[0].outcome.computed().unwrap();
        assert_eq!(stat.n, 60);
        assert!(stat.rho > 0.0);
    }
}
