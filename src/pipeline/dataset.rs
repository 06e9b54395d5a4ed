//! Typed performance records and the immutable normalized dataset

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;
use tracing::warn;

use super::config::{AnalysisConfig, TargetMode};
use super::error::IngestError;
use super::normalize::{correct_percent_scale, raw_target, winsorize, ScaleCorrection, WinsorBounds};

/// One input row
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRecord {
    pub post_id: String,
    pub account_id: String,
    pub posted_at: NaiveDateTime,
    pub followers: u64,
    pub views: u64,
    pub hours_since_post: f64,
    pub engagement_rate: Option<f64>,
    /// Hook feature values, aligned with [`FeatureSet::available`]
    pub features: Vec<Option<f64>>,
}

impl PerformanceRecord {
    /// ISO (year, week) the post belongs to
    pub fn week(&self) -> (i32, u32) {
        let iso = self.posted_at.date().iso_week();
        (iso.year(), iso.week())
    }
}

/// Which recognized features the input carries, computed once at ingestion
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureSet {
    available: Vec<String>,
    unavailable: Vec<String>,
}

impl FeatureSet {
    pub fn new(available: Vec<String>, unavailable: Vec<String>) -> Self {
        Self {
            available,
            unavailable,
        }
    }

    /// Split the configured features by presence, preserving configuration order
    pub fn from_config(config: &AnalysisConfig, is_present: impl Fn(&str) -> bool) -> Self {
        let (available, unavailable): (Vec<&str>, Vec<&str>) = config
            .recognized_features()
            .into_iter()
            .partition(|name| is_present(name));
        Self::new(
            available.into_iter().map(String::from).collect(),
            unavailable.into_iter().map(String::from).collect(),
        )
    }

    pub fn available(&self) -> &[String] {
        &self.available
    }

    pub fn unavailable(&self) -> &[String] {
        &self.unavailable
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.available.iter().position(|f| f == name)
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Names from `names` that are not available
    pub fn missing_of<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        names
            .into_iter()
            .filter(|name| !self.is_available(name))
            .map(String::from)
            .collect()
    }
}

/// What ingestion did to the input on the way in
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestNotes {
    pub rows_read: usize,
    pub rows_dropped: usize,
    /// Canonical column -> input column it was read from
    pub column_map: BTreeMap<String, String>,
    pub scale_corrections: Vec<ScaleCorrection>,
}

/// Records plus their normalized target; immutable once built
#[derive(Debug, Clone)]
pub struct NormalizedDataset {
    records: Vec<PerformanceRecord>,
    y_norm: Vec<f64>,
    features: FeatureSet,
    winsor: WinsorBounds,
    target_mode: TargetMode,
    notes: IngestNotes,
}

impl NormalizedDataset {
    /// Repair feature scales, compute `y_norm`, and winsorize it.
    ///
    /// In engagement mode, records without an engagement rate are dropped.
    pub fn from_records(
        mut records: Vec<PerformanceRecord>,
        features: FeatureSet,
        config: &AnalysisConfig,
        mut notes: IngestNotes,
    ) -> Result<Self, IngestError> {
        if notes.rows_read == 0 {
            notes.rows_read = records.len();
        }
        if records.is_empty() {
            return Err(IngestError::EmptyDataset {
                detail: "no data rows".to_string(),
            });
        }

        let before = records.len();
        records.retain(|r| raw_target(r, config.target_mode, config.decay_beta).is_some());
        let dropped = before - records.len();
        if dropped > 0 {
            warn!(
                dropped,
                target = %config.target_mode,
                "dropped rows without a value for the configured target"
            );
            notes.rows_dropped += dropped;
        }
        if records.is_empty() {
            return Err(IngestError::EmptyDataset {
                detail: format!("no rows have a value for target mode '{}'", config.target_mode),
            });
        }

        notes.scale_corrections = correct_percent_scale(&mut records, &features, config);

        let mut y_norm: Vec<f64> = records
            .iter()
            .filter_map(|r| raw_target(r, config.target_mode, config.decay_beta))
            .collect();
        let winsor = winsorize(&mut y_norm, config.winsor_lower_pct, config.winsor_upper_pct)
            .ok_or_else(|| IngestError::EmptyDataset {
                detail: "no target values".to_string(),
            })?;

        Ok(Self {
            records,
            y_norm,
            features,
            winsor,
            target_mode: config.target_mode,
            notes,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PerformanceRecord] {
        &self.records
    }

    pub fn y_norm(&self) -> &[f64] {
        &self.y_norm
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn winsor(&self) -> &WinsorBounds {
        &self.winsor
    }

    pub fn target_mode(&self) -> TargetMode {
        self.target_mode
    }

    pub fn notes(&self) -> &IngestNotes {
        &self.notes
    }

    /// Values of an available feature, one per record
    pub fn feature_values(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.features.index_of(name)?;
        Some(self.records.iter().map(|r| r.features[idx]).collect())
    }

    pub fn account_count(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.account_id.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn week_count(&self) -> usize {
        self.records
            .iter()
            .map(PerformanceRecord::week)
            .collect::<BTreeSet<_>>()
            .len()
    }
}
