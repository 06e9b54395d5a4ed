//! Markdown narrative: top findings, then every result in full

use std::fmt::Write;

use crate::pipeline::{AnalysisResults, Outcome, TargetMode};

use super::findings::{format_p, Finding};
use super::tables::{DatasetSummary, ReportMetadata};

/// Render `report.md`. Nothing computed is left out of the detail sections.
pub fn render_narrative(
    metadata: &ReportMetadata,
    dataset: &DatasetSummary,
    results: &AnalysisResults,
    findings: &[Finding],
) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_narrative(&mut out, metadata, dataset, results, findings);
    out
}

fn write_narrative(
    out: &mut String,
    metadata: &ReportMetadata,
    dataset: &DatasetSummary,
    results: &AnalysisResults,
    findings: &[Finding],
) -> std::fmt::Result {
    writeln!(out, "# Hook performance analysis")?;
    writeln!(out)?;
    writeln!(
        out,
        "Generated {} by hookstat v{} from `{}`.",
        metadata.timestamp, metadata.hookstat_version, metadata.input_file
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "All statistics are correlational. The target is normalized for audience size and post age; \
         the pairwise model additionally compares posts only within the same creator and week."
    )?;
    writeln!(out)?;

    write_dataset(out, metadata, dataset)?;

    writeln!(out, "## Top findings")?;
    writeln!(out)?;
    if findings.is_empty() {
        writeln!(out, "_No test produced a usable finding._")?;
    } else {
        for finding in findings {
            writeln!(
                out,
                "{}. **{}** ({}): {} _(score {:.3})_",
                finding.rank, finding.name, finding.analyzer, finding.headline, finding.score
            )?;
        }
    }
    writeln!(out)?;

    write_univariate(out, results)?;
    write_pairwise(out, results)?;
    write_interactions(out, results)?;
    write_buckets(out, results)?;
    write_skipped(out, results)?;
    Ok(())
}

fn write_dataset(
    out: &mut String,
    metadata: &ReportMetadata,
    dataset: &DatasetSummary,
) -> std::fmt::Result {
    let params = &metadata.parameters;
    writeln!(out, "## Dataset")?;
    writeln!(out)?;
    writeln!(
        out,
        "- Rows analyzed: {} of {} read ({} dropped)",
        dataset.rows_analyzed, dataset.rows_read, dataset.rows_dropped
    )?;
    writeln!(
        out,
        "- Accounts: {}, posting weeks: {}",
        dataset.accounts, dataset.weeks
    )?;
    let target = match params.target_mode {
        TargetMode::Views => "ln(views+1) − ln(followers+1) − β·ln(hours+1)",
        TargetMode::Engagement => "ln(engagement_rate+1) − β·ln(hours+1)",
    };
    writeln!(out, "- Target: `{}` with β = {}", target, params.decay_beta)?;
    let w = &dataset.winsorization;
    writeln!(
        out,
        "- Winsorized at the {}th/{}th percentiles: [{:.3}, {:.3}], {} clipped low, {} clipped high",
        w.lower_pct, w.upper_pct, w.lower, w.upper, w.clipped_low, w.clipped_high
    )?;
    writeln!(
        out,
        "- Features available: {}",
        list_or_none(&dataset.features_available)
    )?;
    writeln!(
        out,
        "- Features not found: {}",
        list_or_none(&dataset.features_unavailable)
    )?;
    for correction in &dataset.scale_corrections {
        writeln!(
            out,
            "- `{}` looked like a percentage (max {:.1}, median {:.1}) and was divided by 100",
            correction.feature, correction.observed_max, correction.observed_median
        )?;
    }
    writeln!(out)
}

fn write_univariate(out: &mut String, results: &AnalysisResults) -> std::fmt::Result {
    writeln!(out, "## Univariate correlations")?;
    writeln!(out)?;
    writeln!(out, "| Feature | rho | p | p (adj.) | n | Status |")?;
    writeln!(out, "|---|---:|---:|---:|---:|---|")?;
    for result in &results.univariate {
        match &result.outcome {
            Outcome::Computed(s) => writeln!(
                out,
                "| {} | {:+.3} | {} | {} | {} | computed |",
                result.name,
                s.rho,
                format_p(s.p_value),
                format_p(s.p_adjusted),
                s.n
            )?,
            Outcome::Skipped(reason) => {
                writeln!(out, "| {} | | | | | {} |", result.name, reason)?
            }
        }
    }
    writeln!(out)
}

fn write_pairwise(out: &mut String, results: &AnalysisResults) -> std::fmt::Result {
    writeln!(out, "## Pairwise ranking model")?;
    writeln!(out)?;
    let model = match &results.pairwise {
        Outcome::Computed(model) => model,
        Outcome::Skipped(reason) => {
            writeln!(out, "Model not fitted: {}.", reason)?;
            return writeln!(out);
        }
    };

    writeln!(
        out,
        "- Pairs: {} from {} creator-weeks ({} tied pairs excluded)",
        model.n_pairs, model.n_groups, model.n_tied_excluded
    )?;
    writeln!(
        out,
        "- Cross-validated AUC: **{:.3} ± {:.3}** over {} folds",
        model.cv_auc_mean, model.cv_auc_std, model.folds
    )?;
    writeln!(
        out,
        "- Training AUC of the all-pairs refit: {:.3} (optimistic, not a validation metric)",
        model.training_auc
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "| Feature | Coefficient (standardized) | Coefficient (raw) | Pair coverage | Status |"
    )?;
    writeln!(out, "|---|---:|---:|---:|---|")?;
    for entry in &model.coefficients {
        match &entry.outcome {
            Outcome::Computed(w) => writeln!(
                out,
                "| {} | {:+.3} | {:+.4} | {} | modelled |",
                entry.name, w.coefficient, w.raw_coefficient, w.pair_coverage
            )?,
            Outcome::Skipped(reason) => writeln!(out, "| {} | | | | {} |", entry.name, reason)?,
        }
    }
    writeln!(out)
}

fn write_interactions(out: &mut String, results: &AnalysisResults) -> std::fmt::Result {
    writeln!(out, "## Interactions")?;
    writeln!(out)?;
    writeln!(out, "| Interaction | Definition | rho | p | p (adj.) | n | Status |")?;
    writeln!(out, "|---|---|---:|---:|---:|---:|---|")?;
    for result in &results.interactions {
        match &result.outcome {
            Outcome::Computed(s) => writeln!(
                out,
                "| {} | {} | {:+.3} | {} | {} | {} | computed |",
                result.label,
                result.description,
                s.rho,
                format_p(s.p_value),
                format_p(s.p_adjusted),
                s.n
            )?,
            Outcome::Skipped(reason) => writeln!(
                out,
                "| {} | {} | | | | | {} |",
                result.label, result.description, reason
            )?,
        }
    }
    writeln!(out)
}

fn write_buckets(out: &mut String, results: &AnalysisResults) -> std::fmt::Result {
    writeln!(out, "## Bucket rules")?;
    writeln!(out)?;
    writeln!(
        out,
        "Lift is the bucket median minus the median over all records the rule can be evaluated on, in log units."
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "| Rule | Predicate | n bucket | n total | Bucket median | Overall median | Lift | Win rate | p | Status |"
    )?;
    writeln!(out, "|---|---|---:|---:|---:|---:|---:|---:|---:|---|")?;
    for result in &results.buckets {
        match &result.outcome {
            Outcome::Computed(s) => writeln!(
                out,
                "| {} | {} | {} | {} | {:.3} | {:.3} | {:+.3} | {:.0}% | {} | {} |",
                result.label,
                result.description,
                s.n_bucket,
                s.n_total,
                s.bucket_median,
                s.overall_median,
                s.lift,
                s.win_rate * 100.0,
                s.p_value.map(format_p).unwrap_or_else(|| "n/a".to_string()),
                if s.low_confidence {
                    "low confidence"
                } else {
                    "computed"
                }
            )?,
            Outcome::Skipped(reason) => writeln!(
                out,
                "| {} | {} | | | | | | | | {} |",
                result.label, result.description, reason
            )?,
        }
    }
    writeln!(out)
}

fn write_skipped(out: &mut String, results: &AnalysisResults) -> std::fmt::Result {
    writeln!(out, "## Skipped tests")?;
    writeln!(out)?;
    let skipped = results.skipped_tests();
    if skipped.is_empty() {
        return writeln!(out, "None.");
    }
    writeln!(out, "| Analyzer | Test | Reason |")?;
    writeln!(out, "|---|---|---|")?;
    for test in &skipped {
        writeln!(out, "| {} | {} | {} |", test.analyzer, test.name, test.reason)?;
    }
    Ok(())
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
