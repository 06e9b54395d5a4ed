//! Benchmarks for the rank correlation and the pairwise ranking model
//!
//! Run with: cargo bench --bench analysis_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use faer::Mat;
use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;

use hookstat::pipeline::correlation::spearman;
use hookstat::pipeline::pairwise::fit_logistic;
use hookstat::pipeline::{analyze_pairwise, ingest_dataframe, AnalysisConfig};

/// Synthetic export: `posts_per_week` posts per account-week, ten hook features
fn generate_posts(accounts: usize, weeks: usize, posts_per_week: usize, seed: u64) -> DataFrame {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let config = AnalysisConfig::default();
    let features = config.recognized_features();

    let n = accounts * weeks * posts_per_week;
    let mut post_id = Vec::with_capacity(n);
    let mut account_id = Vec::with_capacity(n);
    let mut posted_at = Vec::with_capacity(n);
    let mut followers = Vec::with_capacity(n);
    let mut views = Vec::with_capacity(n);
    let mut hours = Vec::with_capacity(n);
    let mut feature_values: Vec<Vec<f64>> = vec![Vec::with_capacity(n); features.len()];

    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
    for a in 0..accounts {
        let audience = 1_000 + 500 * a as u64;
        for w in 0..weeks {
            let day = start + chrono::Duration::weeks(w as i64);
            for k in 0..posts_per_week {
                let shock: f64 = rng.gen();
                post_id.push(format!("{}-{}-{}", a, w, k));
                account_id.push(format!("acct{}", a));
                posted_at.push(format!("{}T{:02}:00:00", day, k % 24));
                followers.push(audience);
                views.push((audience as f64 * (shock + rng.gen::<f64>()).exp()) as u64);
                hours.push(24.0 + rng.gen::<f64>() * 100.0);
                feature_values[0].push(shock);
                for column in feature_values.iter_mut().skip(1) {
                    column.push(rng.gen());
                }
            }
        }
    }

    let mut columns = vec![
        Column::new("post_id".into(), post_id),
        Column::new("account_id".into(), account_id),
        Column::new("posted_at".into(), posted_at),
        Column::new("followers".into(), followers),
        Column::new("views".into(), views),
        Column::new("hours_since_post".into(), hours),
    ];
    for (name, values) in features.iter().zip(feature_values) {
        columns.push(Column::new((*name).into(), values));
    }
    DataFrame::new(columns).expect("Failed to create DataFrame")
}

/// Spearman correlation for varying sample counts
fn benchmark_spearman(c: &mut Criterion) {
    let mut group = c.benchmark_group("spearman_by_rows");
    group.sample_size(30);

    for n_rows in [1_000, 10_000, 100_000] {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let x: Vec<f64> = (0..n_rows).map(|_| rng.gen::<f64>()).collect();
        // Coarse values so that tie handling is exercised
        let y: Vec<f64> = x
            .iter()
            .map(|v| ((v + rng.gen::<f64>()) * 20.0).round())
            .collect();

        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(
            BenchmarkId::new("spearman", n_rows),
            &(&x, &y),
            |b, (x, y)| {
                b.iter(|| spearman(black_box(x), black_box(y)));
            },
        );
    }

    group.finish();
}

/// Newton solver on a standardized design matrix of pair differences
fn benchmark_logistic_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("logistic_fit_by_pairs");
    group.sample_size(20);

    let n_features = 10;
    for n_pairs in [500, 5_000, 50_000] {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let x = Mat::from_fn(n_pairs, n_features, |_, _| rng.gen::<f64>() * 2.0 - 1.0);
        let y: Vec<f64> = (0..n_pairs)
            .map(|i| if x[(i, 0)] + rng.gen::<f64>() - 0.5 > 0.0 { 1.0 } else { 0.0 })
            .collect();

        group.throughput(Throughput::Elements(n_pairs as u64));
        group.bench_with_input(
            BenchmarkId::new("newton", n_pairs),
            &(&x, &y),
            |b, (x, y)| {
                b.iter(|| fit_logistic(black_box(x), black_box(y), black_box(1.0)));
            },
        );
    }

    group.finish();
}

/// Pair construction, cross-validation and refit end to end
fn benchmark_pairwise_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("pairwise_model");
    group.sample_size(10);

    let config = AnalysisConfig::default();
    for posts_per_week in [4, 8, 16] {
        let df = generate_posts(50, 8, posts_per_week, 42);
        let dataset = ingest_dataframe(&df, &config).expect("Failed to ingest");

        group.bench_with_input(
            BenchmarkId::new("posts_per_week", posts_per_week),
            &dataset,
            |b, dataset| {
                b.iter(|| analyze_pairwise(black_box(dataset), black_box(&config)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_spearman,
    benchmark_logistic_fit,
    benchmark_pairwise_model
);
criterion_main!(benches);
