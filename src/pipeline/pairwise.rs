//! Within-creator, within-week pairwise ranking model
//!
//! Two posts by the same account in the same ISO week share the creator's
//! audience and the week's platform conditions, so the difference of their hook
//! features is compared against which of the two did better. An L2-regularized
//! logistic regression without intercept is fitted on the standardized
//! differences and validated with stratified k-fold cross-validation.
//!
//! The reported coefficients come from a refit on all pairs. The training AUC of
//! that refit is returned separately from the cross-validated AUC and is never
//! the headline number.

use std::collections::BTreeMap;

use faer::prelude::*;
use faer::Side;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use super::config::AnalysisConfig;
use super::dataset::NormalizedDataset;
use super::outcome::{Evaluated, Outcome, SkipReason};
use super::stats::{mean_std, roc_auc};

const MAX_NEWTON_ITERATIONS: usize = 100;
const NEWTON_TOLERANCE: f64 = 1e-9;
/// Added to the Hessian diagonal so an unpenalized fit stays solvable
const HESSIAN_JITTER: f64 = 1e-9;

/// One oriented comparison between two records of the same account and week.
///
/// `label` is true when `first` has the higher normalized target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrainingPair {
    pub first: usize,
    pub second: usize,
    pub label: bool,
}

/// All usable pairs of a dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairSet {
    pub pairs: Vec<TrainingPair>,
    /// (account, week) groups that contributed at least one pair
    pub groups: usize,
    /// Unordered pairs dropped because both records had the same target
    pub tied: usize,
}

/// Learned weight of one feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureWeight {
    /// Coefficient on the standardized difference
    pub coefficient: f64,
    /// Coefficient per unit of the raw feature difference
    pub raw_coefficient: f64,
    /// Pairs where both members have the feature
    pub pair_coverage: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingModel {
    pub n_pairs: usize,
    pub n_groups: usize,
    pub n_tied_excluded: usize,
    /// Pairs whose first member won
    pub n_positive: usize,
    pub folds: usize,
    pub cv_auc_mean: f64,
    pub cv_auc_std: f64,
    pub fold_aucs: Vec<f64>,
    /// AUC of the all-pairs refit on its own training data
    pub training_auc: f64,
    pub l2_penalty: f64,
    /// Modelled features first by |coefficient|, then features left out
    pub coefficients: Vec<Evaluated<FeatureWeight>>,
}

pub type RankingModelResult = Outcome<RankingModel>;

/// Build every same-account, same-week pair, orienting each by a seeded coin
/// flip and dropping pairs with equal targets.
pub fn build_pairs(dataset: &NormalizedDataset, seed: u64) -> PairSet {
    let mut groups: BTreeMap<(&str, (i32, u32)), Vec<usize>> = BTreeMap::new();
    for (idx, record) in dataset.records().iter().enumerate() {
        groups
            .entry((record.account_id.as_str(), record.week()))
            .or_default()
            .push(idx);
    }

    let y = dataset.y_norm();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut set = PairSet::default();

    for members in groups.values() {
        let before = set.pairs.len();
        for (pos, &a) in members.iter().enumerate() {
            for &b in &members[pos + 1..] {
                if y[a] == y[b] {
                    set.tied += 1;
                    continue;
                }
                let (first, second) = if rng.gen::<bool>() { (a, b) } else { (b, a) };
                set.pairs.push(TrainingPair {
                    first,
                    second,
                    label: y[first] > y[second],
                });
            }
        }
        if set.pairs.len() > before {
            set.groups += 1;
        }
    }

    set
}

/// Fit and cross-validate the pairwise ranking model
pub fn analyze_pairwise(dataset: &NormalizedDataset, config: &AnalysisConfig) -> RankingModelResult {
    let pair_set = build_pairs(dataset, config.seed);
    let pairs = &pair_set.pairs;

    if pairs.is_empty() {
        return Outcome::Skipped(SkipReason::NoSignal {
            detail: "no same-account, same-week pairs with differing targets".to_string(),
        });
    }
    if pairs.len() < config.min_pairs {
        return Outcome::Skipped(SkipReason::InsufficientPairs {
            available: pairs.len(),
            required: config.min_pairs,
        });
    }

    let labels: Vec<bool> = pairs.iter().map(|p| p.label).collect();
    let n_positive = labels.iter().filter(|&&l| l).count();
    let minority = n_positive.min(labels.len() - n_positive);
    if minority == 0 {
        return Outcome::Skipped(SkipReason::NoSignal {
            detail: "every pair has the same outcome direction".to_string(),
        });
    }
    let folds = config.cv_folds.min(minority);
    if folds < 2 {
        return Outcome::Skipped(SkipReason::NoSignal {
            detail: format!("only {} pair(s) in the minority direction", minority),
        });
    }

    // Feature selection by pair coverage
    let mut modelled: Vec<(String, usize, Vec<f64>)> = Vec::new();
    let mut left_out: Vec<Evaluated<FeatureWeight>> = Vec::new();

    for name in dataset.features().available() {
        let Some(values) = dataset.feature_values(name) else {
            continue;
        };
        let (deltas, coverage) = pair_deltas(pairs, &values);
        if coverage < config.min_pairs {
            left_out.push(Evaluated::skipped(
                name.as_str(),
                SkipReason::InsufficientPairs {
                    available: coverage,
                    required: config.min_pairs,
                },
            ));
        } else if deltas.iter().all(|d| *d == 0.0) {
            left_out.push(Evaluated::skipped(
                name.as_str(),
                SkipReason::NoSignal {
                    detail: "feature never differs within a pair".to_string(),
                },
            ));
        } else {
            modelled.push((name.clone(), coverage, deltas));
        }
    }
    for name in dataset.features().unavailable() {
        left_out.push(Evaluated::skipped(
            name.as_str(),
            SkipReason::ColumnNotFound {
                columns: vec![name.clone()],
            },
        ));
    }

    if modelled.is_empty() {
        return Outcome::Skipped(SkipReason::NoSignal {
            detail: format!(
                "no feature is present in both members of at least {} pairs",
                config.min_pairs
            ),
        });
    }

    let columns: Vec<&[f64]> = modelled.iter().map(|(_, _, d)| d.as_slice()).collect();
    let all_rows: Vec<usize> = (0..pairs.len()).collect();

    let fold_of = stratified_folds(&labels, folds, config.seed);
    let fold_aucs: Vec<f64> = (0..folds)
        .into_par_iter()
        .filter_map(|fold| {
            let (train, test): (Vec<usize>, Vec<usize>) =
                all_rows.iter().copied().partition(|&row| fold_of[row] != fold);
            let auc = fold_auc(&columns, &labels, &train, &test, config.l2_penalty);
            match auc {
                Some(auc) => debug!(fold, auc, "cross-validation fold"),
                None => warn!(fold, "fold produced no AUC"),
            }
            auc
        })
        .collect();

    let Some((cv_auc_mean, cv_auc_std)) = mean_std(&fold_aucs) else {
        return Outcome::Skipped(SkipReason::NoSignal {
            detail: "no cross-validation fold could be scored".to_string(),
        });
    };

    // Refit on everything for the reported weights
    let scales = column_scales(&columns, &all_rows);
    let x = design_matrix(&columns, &all_rows, &scales);
    let y: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
    let weights = fit_logistic(&x, &y, config.l2_penalty);
    let training_auc = roc_auc(&scores(&x, &weights), &labels).unwrap_or(0.5);

    let mut coefficients: Vec<Evaluated<FeatureWeight>> = modelled
        .iter()
        .zip(weights.iter().zip(&scales))
        .map(|((name, coverage, _), (&w, &scale))| {
            Evaluated::new(
                name.as_str(),
                Outcome::Computed(FeatureWeight {
                    coefficient: w,
                    raw_coefficient: w / scale,
                    pair_coverage: *coverage,
                }),
            )
        })
        .collect();
    coefficients.sort_by(|a, b| {
        let key = |e: &Evaluated<FeatureWeight>| {
            e.outcome.computed().map(|w| w.coefficient.abs()).unwrap_or(0.0)
        };
        key(b).total_cmp(&key(a))
    });
    coefficients.extend(left_out);

    Outcome::Computed(RankingModel {
        n_pairs: pairs.len(),
        n_groups: pair_set.groups,
        n_tied_excluded: pair_set.tied,
        n_positive,
        folds,
        cv_auc_mean,
        cv_auc_std,
        fold_aucs,
        training_auc,
        l2_penalty: config.l2_penalty,
        coefficients,
    })
}

/// Per-pair `first - second` differences of one feature; a pair missing the
/// feature on either side contributes 0. Also returns how many pairs had both.
fn pair_deltas(pairs: &[TrainingPair], values: &[Option<f64>]) -> (Vec<f64>, usize) {
    let mut coverage = 0;
    let deltas: Vec<f64> = pairs
        .iter()
        .map(|p| match (values[p.first], values[p.second]) {
            (Some(a), Some(b)) => {
                coverage += 1;
                a - b
            }
            _ => 0.0,
        })
        .collect();
    (deltas, coverage)
}

/// Assign each row to a fold, spreading each class evenly after a seeded shuffle
fn stratified_folds(labels: &[bool], folds: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut fold_of = vec![0; labels.len()];
    for class in [true, false] {
        let mut rows: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
        rows.shuffle(&mut rng);
        for (pos, row) in rows.into_iter().enumerate() {
            fold_of[row] = pos % folds;
        }
    }
    fold_of
}

fn fold_auc(
    columns: &[&[f64]],
    labels: &[bool],
    train: &[usize],
    test: &[usize],
    l2_penalty: f64,
) -> Option<f64> {
    let scales = column_scales(columns, train);
    let x_train = design_matrix(columns, train, &scales);
    let y_train: Vec<f64> = train
        .iter()
        .map(|&row| if labels[row] { 1.0 } else { 0.0 })
        .collect();
    let weights = fit_logistic(&x_train, &y_train, l2_penalty);

    let x_test = design_matrix(columns, test, &scales);
    let test_labels: Vec<bool> = test.iter().map(|&row| labels[row]).collect();
    roc_auc(&scores(&x_test, &weights), &test_labels)
}

/// Standard deviation of each column over `rows`, without centering the
/// differences. Constant columns get scale 1.
fn column_scales(columns: &[&[f64]], rows: &[usize]) -> Vec<f64> {
    columns
        .iter()
        .map(|col| {
            let values: Vec<f64> = rows.iter().map(|&r| col[r]).collect();
            match mean_std(&values) {
                Some((_, sd)) if sd > f64::EPSILON => sd,
                _ => 1.0,
            }
        })
        .collect()
}

fn design_matrix(columns: &[&[f64]], rows: &[usize], scales: &[f64]) -> Mat<f64> {
    Mat::from_fn(rows.len(), columns.len(), |i, k| columns[k][rows[i]] / scales[k])
}

fn scores(x: &Mat<f64>, weights: &[f64]) -> Vec<f64> {
    (0..x.nrows())
        .map(|i| (0..x.ncols()).map(|k| x[(i, k)] * weights[k]).sum())
        .collect()
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// L2-regularized logistic regression without intercept, fitted by Newton's
/// method (IRLS). Maximizes `sum log-likelihood - l2/2 * |w|^2`.
pub fn fit_logistic(x: &Mat<f64>, y: &[f64], l2_penalty: f64) -> Vec<f64> {
    let n = x.nrows();
    let p = x.ncols();
    let mut w = vec![0.0; p];

    for iteration in 0..MAX_NEWTON_ITERATIONS {
        let probs: Vec<f64> = scores(x, &w).into_iter().map(sigmoid).collect();

        let mut gradient: Vec<f64> = w.iter().map(|wk| -l2_penalty * wk).collect();
        for i in 0..n {
            let residual = y[i] - probs[i];
            for (k, g) in gradient.iter_mut().enumerate() {
                *g += x[(i, k)] * residual;
            }
        }

        // H = X^T W X + (l2 + jitter) I, formed from sqrt(W) X
        let sqrt_w: Vec<f64> = probs.iter().map(|p| (p * (1.0 - p)).sqrt()).collect();
        let xw = Mat::from_fn(n, p, |i, k| x[(i, k)] * sqrt_w[i]);
        let mut hessian = xw.transpose() * &xw;
        for k in 0..p {
            hessian[(k, k)] += l2_penalty + HESSIAN_JITTER;
        }

        let Some(step) = cholesky_solve(&hessian, &gradient) else {
            warn!(iteration, "Newton step not solvable, stopping early");
            break;
        };
        let mut max_change: f64 = 0.0;
        for (wk, sk) in w.iter_mut().zip(&step) {
            *wk += sk;
            max_change = max_change.max(sk.abs());
        }
        if max_change < NEWTON_TOLERANCE {
            break;
        }
    }

    w
}

/// Solve `a x = b` for symmetric positive definite `a`. `None` when the
/// factorization fails or the solution is not finite.
fn cholesky_solve(a: &Mat<f64>, b: &[f64]) -> Option<Vec<f64>> {
    let llt = a.cholesky(Side::Lower).ok()?;
    let rhs = Mat::from_fn(b.len(), 1, |k, _| b[k]);
    let solution = llt.solve(rhs.as_ref());
    let x: Vec<f64> = (0..b.len()).map(|k| solution[(k, 0)]).collect();
    x.iter().all(|v| v.is_finite()).then_some(x)
}
