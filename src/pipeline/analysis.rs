//! Runs the four analyzers over one normalized dataset

use serde::Serialize;

use super::buckets::{analyze_buckets, BucketRuleResult};
use super::config::AnalysisConfig;
use super::dataset::NormalizedDataset;
use super::interactions::{analyze_interactions, InteractionResult};
use super::outcome::{skipped_ledger, Evaluated, Outcome, SkippedTest};
use super::pairwise::{analyze_pairwise, RankingModelResult};
use super::univariate::{analyze_univariate, UnivariateResult};

/// Everything the report emitter needs, independent of presentation
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResults {
    pub univariate: Vec<UnivariateResult>,
    pub pairwise: RankingModelResult,
    pub interactions: Vec<InteractionResult>,
    pub buckets: Vec<BucketRuleResult>,
}

/// Run univariate, pairwise, interaction and bucket analysis in parallel.
///
/// Every analyzer only reads the dataset and configuration, so the results are
/// identical to a sequential run.
pub fn run_analysis(dataset: &NormalizedDataset, config: &AnalysisConfig) -> AnalysisResults {
    let ((univariate, pairwise), (interactions, buckets)) = rayon::join(
        || {
            rayon::join(
                || analyze_univariate(dataset, config),
                || analyze_pairwise(dataset, config),
            )
        },
        || {
            rayon::join(
                || analyze_interactions(dataset, config),
                || analyze_buckets(dataset, config),
            )
        },
    );

    AnalysisResults {
        univariate,
        pairwise,
        interactions,
        buckets,
    }
}

impl AnalysisResults {
    /// Every test that did not produce a statistic, across all analyzers
    pub fn skipped_tests(&self) -> Vec<SkippedTest> {
        let mut ledger = skipped_ledger("univariate", &self.univariate);

        match &self.pairwise {
            Outcome::Skipped(reason) => ledger.push(SkippedTest {
                analyzer: "pairwise".to_string(),
                name: "ranking model".to_string(),
                reason: reason.clone(),
            }),
            Outcome::Computed(model) => {
                ledger.extend(skipped_ledger("pairwise", &model.coefficients));
            }
        }

        let interactions: Vec<Evaluated<()>> = self
            .interactions
            .iter()
            .map(|r| Evaluated::new(r.label.as_str(), r.outcome.clone().map(|_| ())))
            .collect();
        ledger.extend(skipped_ledger("interaction", &interactions));

        let buckets: Vec<Evaluated<()>> = self
            .buckets
            .iter()
            .map(|r| Evaluated::new(r.label.as_str(), r.outcome.clone().map(|_| ())))
            .collect();
        ledger.extend(skipped_ledger("bucket", &buckets));

        ledger
    }

    pub fn computed_count(&self) -> usize {
        self.univariate.iter().filter(|r| r.outcome.is_computed()).count()
            + usize::from(self.pairwise.is_computed())
            + self.interactions.iter().filter(|r| r.outcome.is_computed()).count()
            + self.buckets.iter().filter(|r| r.outcome.is_computed()).count()
    }
}
