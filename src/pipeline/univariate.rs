//! Per-feature Spearman correlation against the normalized target

use serde::Serialize;

use super::config::AnalysisConfig;
use super::correlation::{bonferroni, spearman};
use super::dataset::NormalizedDataset;
use super::outcome::{Evaluated, Outcome, SkipReason};

/// A computed rank correlation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrelationStat {
    pub rho: f64,
    pub p_value: f64,
    /// Bonferroni-adjusted p-value over every configured test of the analyzer,
    /// so it does not depend on which other columns were present
    pub p_adjusted: f64,
    pub n: usize,
}

pub type UnivariateResult = Evaluated<CorrelationStat>;

/// Correlate an optional-valued series with the target over rows where the
/// value is present.
///
/// `family_size` is the number of configured tests the adjustment covers.
pub fn correlate(
    values: &[Option<f64>],
    y: &[f64],
    min_samples: usize,
    family_size: usize,
) -> Outcome<CorrelationStat> {
    let (x, y): (Vec<f64>, Vec<f64>) = values
        .iter()
        .zip(y)
        .filter_map(|(v, &y)| v.map(|v| (v, y)))
        .unzip();

    if x.len() < min_samples {
        return Outcome::Skipped(SkipReason::InsufficientData {
            available: x.len(),
            required: min_samples,
        });
    }

    match spearman(&x, &y) {
        Some(result) => Outcome::Computed(CorrelationStat {
            rho: result.rho,
            p_value: result.p_value,
            p_adjusted: bonferroni(result.p_value, family_size),
            n: result.n,
        }),
        None => Outcome::Skipped(SkipReason::NoSignal {
            detail: "zero variance in feature or target".to_string(),
        }),
    }
}

/// Order computed entries by |rho| descending, skipped entries after them in
/// input order
pub fn sort_by_strength(results: &mut [Evaluated<CorrelationStat>]) {
    results.sort_by(|a, b| {
        let key = |r: &Evaluated<CorrelationStat>| r.outcome.computed().map(|s| s.rho.abs());
        match (key(a), key(b)) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
}

/// Run the univariate test for every recognized feature
pub fn analyze_univariate(
    dataset: &NormalizedDataset,
    config: &AnalysisConfig,
) -> Vec<UnivariateResult> {
    let features = config.recognized_features();
    let family_size = features.len();
    let mut results: Vec<UnivariateResult> = features
        .into_iter()
        .map(|feature| match dataset.feature_values(feature) {
            Some(values) => Evaluated::new(
                feature,
                correlate(&values, dataset.y_norm(), config.min_samples, family_size),
            ),
            None => Evaluated::skipped(
                feature,
                SkipReason::ColumnNotFound {
                    columns: vec![feature.to_string()],
                },
            ),
        })
        .collect();

    sort_by_strength(&mut results);
    results
}
