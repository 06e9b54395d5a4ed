//! Integration tests for the within-creator pairwise ranking model

#[path = "common/mod.rs"]
mod common;

use common::*;
use hookstat::pipeline::{
    analyze_pairwise, build_pairs, AnalysisConfig, Outcome, RankingModel, SkipReason,
};
use polars::prelude::*;

/// 10 accounts with 8 posts each in one week, where higher `p_shock` always
/// means more views
fn separable_frame() -> DataFrame {
    let mut post_id = Vec::new();
    let mut account_id = Vec::new();
    let mut posted_at = Vec::new();
    let mut views = Vec::new();
    let mut shock = Vec::new();

    for a in 0..10 {
        for k in 0..8 {
            let p = 0.05 + 0.1 * k as f64 + 0.01 * a as f64;
            post_id.push(format!("a{}_{}", a, k));
            account_id.push(format!("acct{}", a));
            posted_at.push(format!("2024-03-04T{:02}:00:00", 8 + k));
            views.push((1000.0 * (3.0 * p).exp()).round() as u64);
            shock.push(p);
        }
    }
    let n = post_id.len();

    DataFrame::new(vec![
        Column::new("post_id".into(), post_id),
        Column::new("account_id".into(), account_id),
        Column::new("posted_at".into(), posted_at),
        Column::new("followers".into(), vec![1000u64; n]),
        Column::new("views".into(), views),
        Column::new("hours_since_post".into(), vec![24.0; n]),
        Column::new("p_shock".into(), shock),
    ])
    .unwrap()
}

fn unclipped() -> AnalysisConfig {
    AnalysisConfig {
        winsor_lower_pct: 0.0,
        winsor_upper_pct: 100.0,
        ..Default::default()
    }
}

fn fitted(outcome: Outcome<RankingModel>) -> RankingModel {
    match outcome {
        Outcome::Computed(model) => model,
        Outcome::Skipped(reason) => panic!("model skipped: {}", reason),
    }
}

#[test]
fn test_pairs_stay_within_account_and_week() {
    let config = AnalysisConfig::default();
    let dataset = ingest(&create_post_frame(PostFixture::default()), &config);
    let set = build_pairs(&dataset, config.seed);

    let records = dataset.records();
    assert!(!set.pairs.is_empty());
    for pair in &set.pairs {
        let (a, b) = (&records[pair.first], &records[pair.second]);
        assert_eq!(a.account_id, b.account_id);
        assert_eq!(a.week(), b.week());
        assert_ne!(pair.first, pair.second);
    }
    // 6 accounts x 3 weeks, 5 posts each: 10 unordered pairs per group
    assert_eq!(set.pairs.len() + set.tied, 180);
    assert_eq!(set.groups, 18);
}

#[test]
fn test_pair_labels_follow_the_target() {
    let config = AnalysisConfig::default();
    let dataset = ingest(&create_post_frame(PostFixture::default()), &config);
    let set = build_pairs(&dataset, config.seed);
    let y = dataset.y_norm();

    for pair in &set.pairs {
        assert_eq!(pair.label, y[pair.first] > y[pair.second]);
    }
    // Coin-flip orientation gives both directions
    let positives = set.pairs.iter().filter(|p| p.label).count();
    assert!(positives > 0 && positives < set.pairs.len());
}

#[test]
fn test_separable_signal() {
    let config = unclipped();
    let dataset = ingest(&separable_frame(), &config);
    let model = fitted(analyze_pairwise(&dataset, &config));

    assert_eq!(model.n_pairs, 280);
    assert_eq!(model.n_groups, 10);
    assert_eq!(model.n_tied_excluded, 0);

    let shock = model
        .coefficients
        .iter()
        .find(|c| c.name == "p_shock")
        .unwrap();
    let weight = shock.outcome.computed().unwrap();
    assert!(weight.coefficient > 0.0);
    assert!(weight.raw_coefficient > 0.0);
    assert_eq!(weight.pair_coverage, 280);

    assert_eq!(model.training_auc, 1.0);
    assert!(model.cv_auc_mean > 0.9, "cv auc = {}", model.cv_auc_mean);
    assert_eq!(model.fold_aucs.len(), model.folds);
}

#[test]
fn test_noise_features_give_chance_level_auc() {
    let mut means = Vec::new();
    for seed in 0..5 {
        let fixture = PostFixture {
            accounts: 8,
            weeks: 4,
            posts_per_week: 6,
            seed: 100 + seed,
            shock_effect: 0.0,
        };
        let config = AnalysisConfig {
            seed,
            ..Default::default()
        };
        let dataset = ingest(&create_post_frame(fixture), &config);
        let model = fitted(analyze_pairwise(&dataset, &config));
        means.push(model.cv_auc_mean);
    }

    let mean = means.iter().sum::<f64>() / means.len() as f64;
    assert!((0.4..=0.6).contains(&mean), "mean cv auc = {}", mean);
}

#[test]
fn test_fold_aucs_are_probabilities() {
    let config = AnalysisConfig::default();
    let dataset = ingest(&create_post_frame(PostFixture::default()), &config);
    let model = fitted(analyze_pairwise(&dataset, &config));

    assert_eq!(model.folds, 5);
    for auc in &model.fold_aucs {
        assert!((0.0..=1.0).contains(auc));
    }
    assert!(model.cv_auc_std >= 0.0);
}

#[test]
fn test_single_post_per_week_has_no_pairs() {
    let fixture = PostFixture {
        accounts: 5,
        weeks: 6,
        posts_per_week: 1,
        ..Default::default()
    };
    let config = AnalysisConfig::default();
    let dataset = ingest(&create_post_frame(fixture), &config);

    assert!(matches!(
        analyze_pairwise(&dataset, &config),
        Outcome::Skipped(SkipReason::NoSignal { .. })
    ));
}

#[test]
fn test_few_pairs_is_insufficient() {
    let fixture = PostFixture {
        accounts: 2,
        weeks: 1,
        posts_per_week: 3,
        ..Default::default()
    };
    let config = AnalysisConfig::default();
    let dataset = ingest(&create_post_frame(fixture), &config);

    match analyze_pairwise(&dataset, &config) {
        Outcome::Skipped(SkipReason::InsufficientPairs {
            available,
            required,
        }) => {
            assert!(available <= 6);
            assert_eq!(required, 50);
        }
        other => panic!("expected InsufficientPairs, got {:?}", other),
    }
}

#[test]
fn test_missing_feature_is_listed_as_skipped_coefficient() {
    let config = AnalysisConfig::default();
    let df = without_columns(&create_post_frame(PostFixture::default()), &["cuts_in_2s"]);
    let dataset = ingest(&df, &config);
    let model = fitted(analyze_pairwise(&dataset, &config));

    let cuts = model
        .coefficients
        .iter()
        .find(|c| c.name == "cuts_in_2s")
        .unwrap();
    assert!(matches!(
        cuts.outcome,
        Outcome::Skipped(SkipReason::ColumnNotFound { .. })
    ));
    assert!(model.coefficients[0].outcome.is_computed());
}

#[test]
fn test_model_is_deterministic() {
    let config = AnalysisConfig::default();
    let dataset = ingest(&create_post_frame(PostFixture::default()), &config);
    assert_eq!(
        analyze_pairwise(&dataset, &config),
        analyze_pairwise(&dataset, &config)
    );
}
