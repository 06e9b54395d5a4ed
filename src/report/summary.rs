//! Console run summary

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{AnalysisResults, Outcome};

use super::findings::Finding;
use super::tables::DatasetSummary;

/// Counts shown at the end of a run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows_analyzed: usize,
    pub rows_dropped: usize,
    pub accounts: usize,
    pub weeks: usize,
    pub features_available: usize,
    pub features_total: usize,
    pub univariate_computed: usize,
    pub univariate_total: usize,
    /// CV AUC mean and std, or why the model was skipped
    pub pairwise: Result<(f64, f64), String>,
    pub interactions_computed: usize,
    pub interactions_total: usize,
    pub buckets_computed: usize,
    pub buckets_total: usize,
    pub skipped: usize,
    pub top_findings: Vec<String>,
}

impl RunSummary {
    pub fn new(dataset: &DatasetSummary, results: &AnalysisResults, findings: &[Finding]) -> Self {
        let pairwise = match &results.pairwise {
            Outcome::Computed(model) => Ok((model.cv_auc_mean, model.cv_auc_std)),
            Outcome::Skipped(reason) => Err(reason.to_string()),
        };
        Self {
            rows_analyzed: dataset.rows_analyzed,
            rows_dropped: dataset.rows_dropped,
            accounts: dataset.accounts,
            weeks: dataset.weeks,
            features_available: dataset.features_available.len(),
            features_total: dataset.features_available.len() + dataset.features_unavailable.len(),
            univariate_computed: results
                .univariate
                .iter()
                .filter(|r| r.outcome.is_computed())
                .count(),
            univariate_total: results.univariate.len(),
            pairwise,
            interactions_computed: results
                .interactions
                .iter()
                .filter(|r| r.outcome.is_computed())
                .count(),
            interactions_total: results.interactions.len(),
            buckets_computed: results
                .buckets
                .iter()
                .filter(|r| r.outcome.is_computed())
                .count(),
            buckets_total: results.buckets.len(),
            skipped: results.skipped_tests().len(),
            top_findings: findings
                .iter()
                .map(|f| format!("{}. {}", f.rank, f.headline))
                .collect(),
        }
    }

    fn ratio_cell(computed: usize, total: usize) -> Cell {
        let color = if total == 0 || computed == total {
            Color::Green
        } else if computed == 0 {
            Color::Red
        } else {
            Color::Yellow
        };
        Cell::new(format!("{} / {}", computed, total)).fg(color)
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("📁 Posts analyzed"),
            Cell::new(self.rows_analyzed),
        ]);
        if self.rows_dropped > 0 {
            table.add_row(vec![
                Cell::new("🗑️  Posts dropped"),
                Cell::new(self.rows_dropped).fg(Color::Yellow),
            ]);
        }
        table.add_row(vec![
            Cell::new("👤 Accounts / weeks"),
            Cell::new(format!("{} / {}", self.accounts, self.weeks)),
        ]);
        table.add_row(vec![
            Cell::new("🧩 Hook features found"),
            Self::ratio_cell(self.features_available, self.features_total),
        ]);
        table.add_row(vec![
            Cell::new("📈 Univariate tests"),
            Self::ratio_cell(self.univariate_computed, self.univariate_total),
        ]);
        let pairwise_cell = match &self.pairwise {
            Ok((mean, std)) => Cell::new(format!("CV AUC {:.3} ± {:.3}", mean, std))
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
            Err(reason) => Cell::new(reason).fg(Color::Yellow),
        };
        table.add_row(vec![Cell::new("⚖️  Pairwise model"), pairwise_cell]);
        table.add_row(vec![
            Cell::new("🔀 Interactions"),
            Self::ratio_cell(self.interactions_computed, self.interactions_total),
        ]);
        table.add_row(vec![
            Cell::new("🪣 Bucket rules"),
            Self::ratio_cell(self.buckets_computed, self.buckets_total),
        ]);
        table.add_row(vec![
            Cell::new("⏭️  Skipped tests"),
            Cell::new(self.skipped).fg(if self.skipped == 0 {
                Color::White
            } else {
                Color::Yellow
            }),
        ]);
        table
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("ANALYSIS SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        // Indent the table
        for line in self.to_table().to_string().lines() {
            println!("    {}", line);
        }

        println!();
        println!(
            "    {} {}",
            style("🏆").cyan(),
            style("TOP FINDINGS").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        if self.top_findings.is_empty() {
            println!("      {}", style("No test produced a usable finding").dim());
        }
        for finding in &self.top_findings {
            println!("      {}", finding);
        }
    }
}
