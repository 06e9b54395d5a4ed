//! Analysis configuration: recognized columns, hyperparameters, and the
//! catalogs of named interactions and bucket rules.
//!
//! A single [`AnalysisConfig`] is built once (defaults, optionally a JSON file,
//! then CLI overrides) and passed by reference to every pipeline stage.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Required input columns, by canonical name
pub const POST_ID: &str = "post_id";
pub const ACCOUNT_ID: &str = "account_id";
pub const POSTED_AT: &str = "posted_at";
pub const FOLLOWERS: &str = "followers";
pub const VIEWS: &str = "views";
pub const HOURS_SINCE_POST: &str = "hours_since_post";
pub const ENGAGEMENT_RATE: &str = "engagement_rate";

pub const REQUIRED_COLUMNS: [&str; 6] = [
    POST_ID,
    ACCOUNT_ID,
    POSTED_AT,
    FOLLOWERS,
    VIEWS,
    HOURS_SINCE_POST,
];

/// Which raw response the normalized target is derived from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    /// `ln(views + 1) - ln(followers + 1) - beta * ln(hours + 1)`
    #[default]
    Views,
    /// `ln(engagement_rate + 1) - beta * ln(hours + 1)`; already audience-normalized
    Engagement,
}

impl std::fmt::Display for TargetMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetMode::Views => write!(f, "views"),
            TargetMode::Engagement => write!(f, "engagement"),
        }
    }
}

impl std::str::FromStr for TargetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "views" => Ok(TargetMode::Views),
            "engagement" | "engagement_rate" => Ok(TargetMode::Engagement),
            _ => Err(format!(
                "Unknown target mode: '{}'. Use 'views' or 'engagement'.",
                s
            )),
        }
    }
}

/// Threshold comparison used by gates and bucket conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Lt => value < threshold,
            Comparison::Le => value <= threshold,
            Comparison::Gt => value > threshold,
            Comparison::Ge => value >= threshold,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "≤",
            Comparison::Gt => ">",
            Comparison::Ge => "≥",
        }
    }
}

/// A single `feature <op> threshold` test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub feature: String,
    pub op: Comparison,
    pub threshold: f64,
}

impl Condition {
    pub fn new(feature: &str, op: Comparison, threshold: f64) -> Self {
        Self {
            feature: feature.to_string(),
            op,
            threshold,
        }
    }

    pub fn describe(&self) -> String {
        format!("{} {} {}", self.feature, self.op.symbol(), self.threshold)
    }
}

/// How an interaction combines its base features into one value per record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Combine {
    /// Product of all listed features
    Product { features: Vec<String> },
    /// Minimum of all listed features (fuzzy AND of probabilities)
    Minimum { features: Vec<String> },
    /// `feature`, restricted to records where the gate condition holds
    Gated { feature: String, gate: Condition },
}

impl Combine {
    /// Base features the combination reads
    pub fn features(&self) -> Vec<&str> {
        match self {
            Combine::Product { features } | Combine::Minimum { features } => {
                features.iter().map(String::as_str).collect()
            }
            Combine::Gated { feature, gate } => vec![feature.as_str(), gate.feature.as_str()],
        }
    }

    /// Evaluate for one record, `values` aligned with [`Combine::features`].
    /// Any missing input, or a closed gate, yields `None`.
    pub fn evaluate(&self, values: &[Option<f64>]) -> Option<f64> {
        let present: Option<Vec<f64>> = values.iter().copied().collect();
        let present = present?;
        match self {
            Combine::Product { .. } => Some(present.iter().product()),
            Combine::Minimum { .. } => present.iter().copied().reduce(f64::min),
            Combine::Gated { gate, .. } => {
                let (value, gate_value) = (*present.first()?, *present.get(1)?);
                gate.op.holds(gate_value, gate.threshold).then_some(value)
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Combine::Product { features } => features.join(" × "),
            Combine::Minimum { features } => format!("min({})", features.join(", ")),
            Combine::Gated { feature, gate } => {
                format!("{} where {}", feature, gate.describe())
            }
        }
    }
}

/// A named composite-feature test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionSpec {
    pub label: String,
    pub combine: Combine,
}

/// A named editor-facing threshold rule; all conditions must hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRule {
    pub label: String,
    pub conditions: Vec<Condition>,
}

impl BucketRule {
    pub fn features(&self) -> Vec<&str> {
        let mut features: Vec<&str> = Vec::new();
        for condition in &self.conditions {
            if !features.contains(&condition.feature.as_str()) {
                features.push(condition.feature.as_str());
            }
        }
        features
    }

    pub fn describe(&self) -> String {
        self.conditions
            .iter()
            .map(Condition::describe)
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// Complete, immutable configuration of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Age decay exponent in the target normalization
    pub decay_beta: f64,
    /// Lower winsorization percentile (0-100)
    pub winsor_lower_pct: f64,
    /// Upper winsorization percentile (0-100)
    pub winsor_upper_pct: f64,
    pub target_mode: TargetMode,
    /// Minimum non-missing samples for a correlation test
    pub min_samples: usize,
    /// Minimum same-creator, same-week pairs for the ranking model
    pub min_pairs: usize,
    /// Bucket size below which a rule is flagged low confidence
    pub min_bucket_samples: usize,
    pub cv_folds: usize,
    pub seed: u64,
    /// L2 penalty of the pairwise logistic regression
    pub l2_penalty: f64,
    /// Number of highlighted findings in the narrative
    pub top_findings: usize,
    /// A [0,1] feature is treated as a percentage when its max exceeds this...
    pub percent_max_threshold: f64,
    /// ...and its median exceeds this
    pub percent_median_threshold: f64,
    pub probability_features: Vec<String>,
    pub continuous_features: Vec<String>,
    /// Continuous features that are fractions in [0,1]
    pub fraction_features: Vec<String>,
    /// Canonical column name -> accepted input column names
    pub aliases: BTreeMap<String, Vec<String>>,
    pub interactions: Vec<InteractionSpec>,
    pub bucket_rules: Vec<BucketRule>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let probability_features = [
            "p_shock",
            "p_humor",
            "p_relatable_slice",
            "p_question",
            "p_curiosity_gap",
            "p_tutorial",
        ]
        .map(String::from)
        .to_vec();

        let continuous_features = [
            "payoff_time_sec",
            "face_pct_1s",
            "cuts_in_2s",
            "overlay_chars_per_sec_2s",
        ]
        .map(String::from)
        .to_vec();

        Self {
            decay_beta: 0.20,
            winsor_lower_pct: 1.0,
            winsor_upper_pct: 99.0,
            target_mode: TargetMode::Views,
            min_samples: 20,
            min_pairs: 50,
            min_bucket_samples: 10,
            cv_folds: 5,
            seed: 42,
            l2_penalty: 1.0,
            top_findings: 5,
            percent_max_threshold: 1.5,
            percent_median_threshold: 1.0,
            probability_features,
            continuous_features,
            fraction_features: vec!["face_pct_1s".to_string()],
            aliases: default_aliases(),
            interactions: default_interactions(),
            bucket_rules: default_bucket_rules(),
        }
    }
}

fn default_aliases() -> BTreeMap<String, Vec<String>> {
    let entries: [(&str, &[&str]); 15] = [
        (POST_ID, &["id", "video_id", "postid"]),
        (ACCOUNT_ID, &["creator_id", "author_id", "account", "username"]),
        (POSTED_AT, &["created_at", "post_time", "published_at", "timestamp"]),
        (FOLLOWERS, &["follower_count", "followers_count", "author_followers"]),
        (VIEWS, &["view_count", "play_count", "plays"]),
        (HOURS_SINCE_POST, &["age_hours", "hours_since_posted", "post_age_hours"]),
        (ENGAGEMENT_RATE, &["er", "engagement"]),
        ("p_shock", &["hook_shock_prob", "shock_prob", "prob_shock"]),
        ("p_humor", &["hook_humor_prob", "humor_prob", "prob_humor"]),
        (
            "p_relatable_slice",
            &["hook_relatable_prob", "relatable_prob", "p_relatable"],
        ),
        ("p_question", &["hook_question_prob", "question_prob"]),
        ("payoff_time_sec", &["time_to_payoff", "payoff_sec", "payoff_time_s"]),
        ("face_pct_1s", &["face_presence_1s", "face_pct_first_second"]),
        ("cuts_in_2s", &["cuts_2s", "cut_count_2s"]),
        (
            "overlay_chars_per_sec_2s",
            &["text_density_2s", "overlay_cps_2s"],
        ),
    ];

    entries
        .iter()
        .map(|(canonical, aliases)| {
            (
                canonical.to_string(),
                aliases.iter().map(|a| a.to_string()).collect(),
            )
        })
        .collect()
}

fn default_interactions() -> Vec<InteractionSpec> {
    vec![
        InteractionSpec {
            label: "Shock hook with fast payoff".to_string(),
            combine: Combine::Gated {
                feature: "p_shock".to_string(),
                gate: Condition::new("payoff_time_sec", Comparison::Le, 1.5),
            },
        },
        InteractionSpec {
            label: "Humor delivered on camera".to_string(),
            combine: Combine::Product {
                features: vec!["p_humor".to_string(), "face_pct_1s".to_string()],
            },
        },
        InteractionSpec {
            label: "Question hook with face present".to_string(),
            combine: Combine::Gated {
                feature: "p_question".to_string(),
                gate: Condition::new("face_pct_1s", Comparison::Ge, 0.5),
            },
        },
        InteractionSpec {
            label: "Relatable slice and curiosity gap together".to_string(),
            combine: Combine::Minimum {
                features: vec![
                    "p_relatable_slice".to_string(),
                    "p_curiosity_gap".to_string(),
                ],
            },
        },
        InteractionSpec {
            label: "Curiosity gap with text overlay".to_string(),
            combine: Combine::Product {
                features: vec![
                    "p_curiosity_gap".to_string(),
                    "overlay_chars_per_sec_2s".to_string(),
                ],
            },
        },
    ]
}

fn default_bucket_rules() -> Vec<BucketRule> {
    vec![
        BucketRule {
            label: "Payoff within the first second".to_string(),
            conditions: vec![Condition::new("payoff_time_sec", Comparison::Le, 1.0)],
        },
        BucketRule {
            label: "Face on screen for most of second one".to_string(),
            conditions: vec![Condition::new("face_pct_1s", Comparison::Ge, 0.5)],
        },
        BucketRule {
            label: "Shock-led hook".to_string(),
            conditions: vec![Condition::new("p_shock", Comparison::Ge, 0.6)],
        },
        BucketRule {
            label: "Fast cutting (3+ cuts in 2s)".to_string(),
            conditions: vec![Condition::new("cuts_in_2s", Comparison::Ge, 3.0)],
        },
        BucketRule {
            label: "Heavy text overlay".to_string(),
            conditions: vec![Condition::new(
                "overlay_chars_per_sec_2s",
                Comparison::Ge,
                15.0,
            )],
        },
        BucketRule {
            label: "Humor with payoff under 1.5s".to_string(),
            conditions: vec![
                Condition::new("p_humor", Comparison::Ge, 0.6),
                Condition::new("payoff_time_sec", Comparison::Le, 1.5),
            ],
        },
    ]
}

impl AnalysisConfig {
    /// Load a configuration from a JSON file; omitted fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write this configuration as pretty JSON
    pub fn write_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Reject parameter combinations no analyzer can run with
    pub fn validate(&self) -> Result<()> {
        if !self.decay_beta.is_finite() || self.decay_beta < 0.0 {
            bail!("decay_beta must be a non-negative number, got {}", self.decay_beta);
        }
        if !(0.0..=100.0).contains(&self.winsor_lower_pct)
            || !(0.0..=100.0).contains(&self.winsor_upper_pct)
            || self.winsor_lower_pct >= self.winsor_upper_pct
        {
            bail!(
                "winsorization bounds must satisfy 0 <= lower < upper <= 100, got {} / {}",
                self.winsor_lower_pct,
                self.winsor_upper_pct
            );
        }
        if self.min_samples < 3 {
            bail!("min_samples must be at least 3, got {}", self.min_samples);
        }
        if self.min_pairs == 0 || self.min_bucket_samples == 0 {
            bail!("min_pairs and min_bucket_samples must be positive");
        }
        if self.cv_folds < 2 {
            bail!("cv_folds must be at least 2, got {}", self.cv_folds);
        }
        if !self.l2_penalty.is_finite() || self.l2_penalty < 0.0 {
            bail!("l2_penalty must be a non-negative number, got {}", self.l2_penalty);
        }
        for spec in &self.interactions {
            if spec.combine.features().len() < 2 {
                bail!(
                    "interaction '{}' must combine at least two features",
                    spec.label
                );
            }
        }
        for rule in &self.bucket_rules {
            if rule.conditions.is_empty() {
                bail!("bucket rule '{}' has no conditions", rule.label);
            }
        }
        Ok(())
    }

    /// Every recognized hook feature, probability features first
    pub fn recognized_features(&self) -> Vec<&str> {
        self.probability_features
            .iter()
            .chain(self.continuous_features.iter())
            .map(String::as_str)
            .collect()
    }

    /// Whether a feature is defined on [0,1] and so subject to the percentage check
    pub fn is_unit_interval(&self, feature: &str) -> bool {
        self.probability_features.iter().any(|f| f == feature)
            || self.fraction_features.iter().any(|f| f == feature)
    }

    /// Input column names accepted for a canonical column, canonical name first
    pub fn column_candidates<'a>(&'a self, canonical: &'a str) -> Vec<&'a str> {
        let mut candidates = vec![canonical];
        if let Some(aliases) = self.aliases.get(canonical) {
            candidates.extend(aliases.iter().map(String::as_str));
        }
        candidates
    }
}
