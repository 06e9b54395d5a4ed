//! Pipeline module - ingestion, normalization and the four analyzers

pub mod analysis;
pub mod buckets;
pub mod config;
pub mod correlation;
pub mod dataset;
pub mod error;
pub mod interactions;
pub mod loader;
pub mod normalize;
pub mod outcome;
pub mod pairwise;
pub mod stats;
pub mod univariate;

pub use analysis::{run_analysis, AnalysisResults};
pub use buckets::{analyze_buckets, BucketRuleResult, BucketStat};
pub use config::{AnalysisConfig, TargetMode};
pub use dataset::{FeatureSet, IngestNotes, NormalizedDataset, PerformanceRecord};
pub use error::IngestError;
pub use interactions::{analyze_interactions, InteractionResult};
pub use loader::*;
pub use outcome::{Evaluated, Outcome, SkipReason, SkippedTest};
pub use pairwise::{analyze_pairwise, build_pairs, RankingModel, RankingModelResult};
pub use univariate::{analyze_univariate, CorrelationStat, UnivariateResult};
