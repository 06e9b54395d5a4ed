//! Cross-analyzer ranking of findings
//!
//! Every computed result is scored as `magnitude × confidence × support`, each
//! factor in [0, 1]:
//!
//! | analyzer    | magnitude          | confidence                 | support              |
//! |-------------|--------------------|----------------------------|----------------------|
//! | univariate  | \|rho\|            | 1 - p                      | n / (n + min_samples) |
//! | interaction | \|rho\|            | 1 - p                      | n / (n + min_samples) |
//! | pairwise    | tanh(\|coef\|)     | clamp(2 (cv_auc - 0.5))    | pairs / (pairs + min_pairs) |
//! | bucket      | tanh(\|lift\|)     | 1 - p (Mann-Whitney)       | n_bucket / (n_bucket + min_bucket) |

use serde::Serialize;

use crate::pipeline::{AnalysisConfig, AnalysisResults, CorrelationStat, Outcome};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub rank: usize,
    pub analyzer: String,
    pub name: String,
    pub headline: String,
    pub magnitude: f64,
    pub confidence: f64,
    pub support: f64,
    pub score: f64,
}

fn support(n: usize, floor: usize) -> f64 {
    let n = n as f64;
    n / (n + floor as f64)
}

fn direction(value: f64) -> &'static str {
    if value > 0.0 {
        "higher"
    } else {
        "lower"
    }
}

fn candidate(
    analyzer: &str,
    name: &str,
    headline: String,
    magnitude: f64,
    confidence: f64,
    support: f64,
) -> Finding {
    let magnitude = magnitude.clamp(0.0, 1.0);
    let confidence = confidence.clamp(0.0, 1.0);
    Finding {
        rank: 0,
        analyzer: analyzer.to_string(),
        name: name.to_string(),
        headline,
        magnitude,
        confidence,
        support,
        score: magnitude * confidence * support,
    }
}

fn correlation_finding(
    analyzer: &str,
    name: &str,
    subject: &str,
    stat: &CorrelationStat,
    config: &AnalysisConfig,
) -> Finding {
    let headline = format!(
        "More {} goes with {} normalized performance (rho = {:+.2}, p = {}, n = {})",
        subject,
        direction(stat.rho),
        stat.rho,
        format_p(stat.p_value),
        stat.n
    );
    candidate(
        analyzer,
        name,
        headline,
        stat.rho.abs(),
        1.0 - stat.p_value,
        support(stat.n, config.min_samples),
    )
}

/// Score every computed result and return the strongest `config.top_findings`
pub fn rank_findings(results: &AnalysisResults, config: &AnalysisConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for result in &results.univariate {
        if let Some(stat) = result.outcome.computed() {
            findings.push(correlation_finding(
                "univariate",
                &result.name,
                &result.name,
                stat,
                config,
            ));
        }
    }

    if let Outcome::Computed(model) = &results.pairwise {
        let confidence = 2.0 * (model.cv_auc_mean - 0.5);
        for entry in &model.coefficients {
            if let Some(weight) = entry.outcome.computed() {
                let headline = format!(
                    "In same-creator, same-week matchups, {} {} tilts the win (coefficient {:+.2}, CV AUC {:.2})",
                    if weight.coefficient > 0.0 { "more" } else { "less" },
                    entry.name,
                    weight.coefficient,
                    model.cv_auc_mean
                );
                findings.push(candidate(
                    "pairwise",
                    &entry.name,
                    headline,
                    weight.coefficient.abs().tanh(),
                    confidence,
                    support(model.n_pairs, config.min_pairs),
                ));
            }
        }
    }

    for result in &results.interactions {
        if let Some(stat) = result.outcome.computed() {
            let subject = format!("{} ({})", result.label, result.description);
            findings.push(correlation_finding(
                "interaction",
                &result.label,
                &subject,
                stat,
                config,
            ));
        }
    }

    for result in &results.buckets {
        if let Some(stat) = result.outcome.computed() {
            let mut headline = format!(
                "{} ({}): median lift {:+.2} log units (×{:.2}) across {} of {} posts",
                result.label,
                result.description,
                stat.lift,
                stat.lift.exp(),
                stat.n_bucket,
                stat.n_total
            );
            if stat.low_confidence {
                headline.push_str(", low confidence");
            }
            findings.push(candidate(
                "bucket",
                &result.label,
                headline,
                stat.lift.abs().tanh(),
                1.0 - stat.p_value.unwrap_or(1.0),
                support(stat.n_bucket, config.min_bucket_samples),
            ));
        }
    }

    findings.retain(|f| f.score > 0.0 && f.score.is_finite());
    findings.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.analyzer.cmp(&b.analyzer))
            .then_with(|| a.name.cmp(&b.name))
    });
    findings.truncate(config.top_findings);
    for (idx, finding) in findings.iter_mut().enumerate() {
        finding.rank = idx + 1;
    }
    findings
}

/// Render a p-value for humans
pub fn format_p(p: f64) -> String {
    if p < 0.001 {
        "<0.001".to_string()
    } else {
        format!("{:.3}", p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{BucketRuleResult, BucketStat, Evaluated, SkipReason};

    fn univariate(name: &str, rho: f64, p_value: f64, n: usize) -> Evaluated<CorrelationStat> {
        Evaluated::new(
            name,
            Outcome::Computed(CorrelationStat {
                rho,
                p_value,
                p_adjusted: p_value,
                n,
            }),
        )
    }

    fn results() -> AnalysisResults {
        AnalysisResults {
            univariate: vec![
                univariate("p_shock", 0.5, 0.001, 200),
                univariate("p_humor", -0.1, 0.4, 200),
                univariate("cuts_in_2s", 0.3, 0.01, 200),
            ],
            pairwise: Outcome::Skipped(SkipReason::InsufficientPairs {
                available: 3,
                required: 50,
            }),
            interactions: vec![],
            buckets: vec![BucketRuleResult {
                label: "fast payoff".to_string(),
                description: "payoff_time_sec ≤ 1".to_string(),
                outcome: Outcome::Computed(BucketStat {
                    n_bucket: 40,
                    n_total: 200,
                    bucket_median: 0.8,
                    overall_median: 0.2,
                    lift: 0.6,
                    win_rate: 0.7,
                    p_value: Some(0.002),
                    low_confidence: false,
                }),
            }],
        }
    }

    #[test]
    fn test_findings_are_ranked_and_capped() {
        let config = AnalysisConfig {
            top_findings: 2,
            ..Default::default()
        };
        let findings = rank_findings(&results(), &config);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].rank, 1);
        assert!(findings[0].score >= findings[1].score);
        assert_eq!(findings[0].name, "p_shock");
        assert_eq!(findings[1].name, "fast payoff");
    }

    #[test]
    fn test_score_is_product_of_factors() {
        let findings = rank_findings(&results(), &AnalysisConfig::default());
        for f in &findings {
            assert!((f.score - f.magnitude * f.confidence * f.support).abs() < 1e-12);
            assert!(f.score <= 1.0);
        }
    }

    #[test]
    fn test_format_p() {
        assert_eq!(format_p(0.0001), "<0.001");
        assert_eq!(format_p(0.0421), "0.042");
    }
}
