//! Confound-adjusted target and input scale repair
//!
//! The normalized target approximates "views per unit audience per unit time"
//! on a log scale:
//!
//! ```text
//! y_norm = ln(views + 1) - ln(followers + 1) - beta * ln(hours_since_post + 1)
//! ```
//!
//! and is winsorized at configurable percentiles so that extreme posts cannot
//! distort tie structure in the rank statistics downstream.

use serde::Serialize;
use tracing::warn;

use super::config::{AnalysisConfig, TargetMode};
use super::dataset::{FeatureSet, PerformanceRecord};
use super::stats::{median, percentile};

/// Clip bounds applied to the target, taken from the pre-clip distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WinsorBounds {
    pub lower_pct: f64,
    pub upper_pct: f64,
    pub lower: f64,
    pub upper: f64,
    pub clipped_low: usize,
    pub clipped_high: usize,
}

/// A [0,1] feature that arrived on a 0-100 scale and was divided by 100
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleCorrection {
    pub feature: String,
    pub observed_max: f64,
    pub observed_median: f64,
}

/// View-based target for one record
pub fn views_target(views: u64, followers: u64, hours_since_post: f64, beta: f64) -> f64 {
    (views as f64 + 1.0).ln() - (followers as f64 + 1.0).ln() - beta * (hours_since_post + 1.0).ln()
}

/// Engagement-based target; engagement rate is already audience-normalized, so
/// the followers term is omitted
pub fn engagement_target(engagement_rate: f64, hours_since_post: f64, beta: f64) -> f64 {
    (engagement_rate + 1.0).ln() - beta * (hours_since_post + 1.0).ln()
}

/// Un-clipped target for a record under the given mode.
///
/// `None` in engagement mode when the record has no engagement rate.
pub fn raw_target(record: &PerformanceRecord, mode: TargetMode, beta: f64) -> Option<f64> {
    match mode {
        TargetMode::Views => Some(views_target(
            record.views,
            record.followers,
            record.hours_since_post,
            beta,
        )),
        TargetMode::Engagement => record
            .engagement_rate
            .map(|er| engagement_target(er, record.hours_since_post, beta)),
    }
}

/// Clip values in place to the `[lower_pct, upper_pct]` percentiles of their own
/// distribution. Percentiles are in 0-100.
pub fn winsorize(values: &mut [f64], lower_pct: f64, upper_pct: f64) -> Option<WinsorBounds> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let lower = percentile(&sorted, lower_pct / 100.0)?;
    let upper = percentile(&sorted, upper_pct / 100.0)?;

    let mut clipped_low = 0;
    let mut clipped_high = 0;
    for value in values.iter_mut() {
        if *value < lower {
            *value = lower;
            clipped_low += 1;
        } else if *value > upper {
            *value = upper;
            clipped_high += 1;
        }
    }

    Some(WinsorBounds {
        lower_pct,
        upper_pct,
        lower,
        upper,
        clipped_low,
        clipped_high,
    })
}

/// Detect [0,1] features supplied as percentages and rescale them in place.
///
/// A feature is rescaled when its observed max exceeds the configured max
/// threshold and its median exceeds the median threshold.
pub fn correct_percent_scale(
    records: &mut [PerformanceRecord],
    features: &FeatureSet,
    config: &AnalysisConfig,
) -> Vec<ScaleCorrection> {
    let mut corrections = Vec::new();

    for (idx, name) in features.available().iter().enumerate() {
        if !config.is_unit_interval(name) {
            continue;
        }

        let observed: Vec<f64> = records.iter().filter_map(|r| r.features[idx]).collect();
        let Some(observed_median) = median(&observed) else {
            continue;
        };
        let observed_max = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if observed_max > config.percent_max_threshold
            && observed_median > config.percent_median_threshold
        {
            warn!(
                feature = %name,
                observed_max,
                observed_median,
                "feature looks like a percentage, dividing by 100"
            );
            for record in records.iter_mut() {
                if let Some(value) = record.features[idx].as_mut() {
                    *value /= 100.0;
                }
            }
            corrections.push(ScaleCorrection {
                feature: name.clone(),
                observed_max,
                observed_median,
            });
        }
    }

    corrections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_views_target_formula() {
        let y = views_target(1000, 100, 24.0, 0.2);
        let expected = 1001f64.ln() - 101f64.ln() - 0.2 * 25f64.ln();
        assert!((y - expected).abs() < 1e-12);
    }

    #[test]
    fn test_zero_beta_ignores_age() {
        assert_eq!(views_target(500, 50, 1.0, 0.0), views_target(500, 50, 300.0, 0.0));
    }

    #[test]
    fn test_engagement_target_omits_followers() {
        let y = engagement_target(0.08, 24.0, 0.2);
        assert!((y - (1.08f64.ln() - 0.2 * 25f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn test_winsorize_clips_tails() {
        let mut values: Vec<f64> = (0..100).map(|v| v as f64).collect();
        values.push(10_000.0);
        values.push(-10_000.0);
        let bounds = winsorize(&mut values, 1.0, 99.0).unwrap();
        assert!(values.iter().all(|&v| v >= bounds.lower && v <= bounds.upper));
        assert_eq!(bounds.clipped_low, 2);
        assert_eq!(bounds.clipped_high, 2);
        assert_eq!(values.len(), 102, "winsorization clips, never drops");
    }

    #[test]
    fn test_winsorize_empty() {
        let mut values: Vec<f64> = Vec::new();
        assert!(winsorize(&mut values, 1.0, 99.0).is_none());
    }
}
