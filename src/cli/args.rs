//! Command-line argument definitions using clap

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::pipeline::{AnalysisConfig, TargetMode};

/// hookstat - Which hook attributes go with better performance, net of audience size and post age
#[derive(Parser, Debug)]
#[command(name = "hookstat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output directory for the tables and the narrative report.
    /// Defaults to '<input stem>_hook_analysis' next to the input file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON configuration file; omitted fields keep their defaults.
    /// Flags given on the command line override values from the file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Age decay exponent in the normalized target (default 0.20)
    #[arg(long, value_parser = validate_beta)]
    pub beta: Option<f64>,

    /// Response to normalize: "views" or "engagement"
    #[arg(long)]
    pub target: Option<TargetMode>,

    /// Lower winsorization percentile of the target (0-100, default 1)
    #[arg(long, value_parser = validate_percentile)]
    pub winsor_lower: Option<f64>,

    /// Upper winsorization percentile of the target (0-100, default 99)
    #[arg(long, value_parser = validate_percentile)]
    pub winsor_upper: Option<f64>,

    /// Cross-validation folds for the pairwise model (default 5)
    #[arg(long, value_parser = clap::value_parser!(u64).range(2..))]
    pub folds: Option<u64>,

    /// Seed for pair orientation and fold assignment (default 42)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Minimum non-missing samples for a correlation test (default 20)
    #[arg(long, value_parser = clap::value_parser!(u64).range(3..))]
    pub min_samples: Option<u64>,

    /// Minimum same-creator, same-week pairs for the pairwise model (default 50)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub min_pairs: Option<u64>,

    /// Bucket size below which a rule is flagged low confidence (default 10)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub min_bucket: Option<u64>,

    /// Also package all artifacts into hook_analysis.zip in the output directory
    #[arg(long, default_value = "false")]
    pub bundle: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default configuration as JSON, ready for editing
    InitConfig {
        /// Destination file
        #[arg(default_value = "hookstat.json")]
        output: PathBuf,
    },
}

impl Cli {
    pub fn input(&self) -> Option<&PathBuf> {
        self.input.as_ref()
    }

    /// Get the output directory, deriving it from the input if not provided.
    pub fn output_dir(&self) -> Option<PathBuf> {
        if let Some(output) = &self.output {
            return Some(output.clone());
        }
        let input = self.input.as_ref()?;
        let parent = input.parent().unwrap_or_else(|| Path::new("."));
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("hookstat");
        Some(parent.join(format!("{}_hook_analysis", stem)))
    }

    /// Build the run configuration: defaults, then the config file, then flags
    pub fn analysis_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(beta) = self.beta {
            config.decay_beta = beta;
        }
        if let Some(target) = self.target {
            config.target_mode = target;
        }
        if let Some(lower) = self.winsor_lower {
            config.winsor_lower_pct = lower;
        }
        if let Some(upper) = self.winsor_upper {
            config.winsor_upper_pct = upper;
        }
        if let Some(folds) = self.folds {
            config.cv_folds = folds as usize;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(n) = self.min_samples {
            config.min_samples = n as usize;
        }
        if let Some(n) = self.min_pairs {
            config.min_pairs = n as usize;
        }
        if let Some(n) = self.min_bucket {
            config.min_bucket_samples = n as usize;
        }

        config
            .validate()
            .context("Invalid analysis configuration")?;
        Ok(config)
    }
}

/// Validator for the decay exponent
fn validate_beta(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !value.is_finite() || value < 0.0 {
        Err(format!("beta must be a non-negative number, got {}", value))
    } else {
        Ok(value)
    }
}

/// Validator for winsorization percentiles
fn validate_percentile(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..=100.0).contains(&value) {
        Err(format!(
            "percentile must be between 0 and 100, got {}",
            value
        ))
    } else {
        Ok(value)
    }
}
