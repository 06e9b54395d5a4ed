//! Rank correlation against the normalized target
//!
//! Spearman's rho is Pearson's correlation on average ranks. The two-sided
//! p-value uses the t approximation with `n - 2` degrees of freedom.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Spearman rank correlation with its significance
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpearmanResult {
    pub rho: f64,
    pub p_value: f64,
    pub n: usize,
}

/// Assign 1-based ranks, giving tied values the average of the ranks they span
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && values[order[j]] == values[order[i]] {
            j += 1;
        }
        // positions i..j (0-based) share ranks i+1..=j
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = avg_rank;
        }
        i = j;
    }
    ranks
}

/// Pearson correlation using a single-pass Welford update.
///
/// Returns `None` for mismatched lengths, fewer than two samples, or when either
/// side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 2 || n != y.len() {
        return None;
    }

    let mut count = 0.0;
    let mut mean_x = 0.0;
    let mut mean_y = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    let mut cov_xy = 0.0;

    for (&xi, &yi) in x.iter().zip(y.iter()) {
        count += 1.0;
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        mean_x += dx / count;
        mean_y += dy / count;
        var_x += dx * (xi - mean_x);
        var_y += dy * (yi - mean_y);
        cov_xy += dx * (yi - mean_y);
    }

    if var_x <= f64::EPSILON * count || var_y <= f64::EPSILON * count {
        return None;
    }

    Some((cov_xy / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Spearman rank correlation between two equally long samples.
///
/// Returns `None` with fewer than three samples or when either side is constant.
pub fn spearman(x: &[f64], y: &[f64]) -> Option<SpearmanResult> {
    let n = x.len();
    if n < 3 || n != y.len() {
        return None;
    }
    let rho = pearson(&average_ranks(x), &average_ranks(y))?;
    Some(SpearmanResult {
        rho,
        p_value: correlation_p_value(rho, n),
        n,
    })
}

/// Two-sided p-value of a correlation coefficient under the null of no association
pub fn correlation_p_value(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    let df = (n - 2) as f64;
    let r2 = r * r;
    if r2 >= 1.0 - 1e-12 {
        return 0.0;
    }
    let t = r * (df / (1.0 - r2)).sqrt();
    student_t_two_sided(t, df)
}

/// Two-sided tail probability of Student's t with `df` degrees of freedom
pub fn student_t_two_sided(t: f64, df: f64) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

/// Bonferroni-adjusted p-value for a test that belongs to a family of
/// `family_size` tests
pub fn bonferroni(p_value: f64, family_size: usize) -> f64 {
    (p_value * family_size.max(1) as f64).min(1.0)
}
