//! Tests for CLI argument parsing and end-to-end runs of the binary

#[path = "common/mod.rs"]
mod common;

use assert_cmd::Command;
use clap::Parser;
use common::*;
use hookstat::cli::{Cli, Commands};
use hookstat::pipeline::TargetMode;
use predicates::prelude::*;
use std::path::PathBuf;

#[test]
fn test_cli_default_values() {
    let cli = Cli::parse_from(["hookstat", "-i", "posts.csv"]);

    assert!(cli.command.is_none());
    assert!(!cli.bundle, "Default bundle should be false");
    assert_eq!(
        cli.infer_schema_length, 10000,
        "Default schema inference should be 10000"
    );

    let config = cli.analysis_config().unwrap();
    assert_eq!(config.decay_beta, 0.20);
    assert_eq!(config.target_mode, TargetMode::Views);
    assert_eq!(config.cv_folds, 5);
    assert_eq!(config.seed, 42);
}

#[test]
fn test_cli_overrides() {
    let cli = Cli::parse_from([
        "hookstat",
        "-i",
        "posts.csv",
        "--beta",
        "0.35",
        "--target",
        "engagement",
        "--winsor-lower",
        "5",
        "--winsor-upper",
        "95",
        "--folds",
        "3",
        "--seed",
        "7",
        "--min-samples",
        "10",
        "--min-pairs",
        "20",
        "--min-bucket",
        "4",
        "--bundle",
    ]);

    let config = cli.analysis_config().unwrap();
    assert_eq!(config.decay_beta, 0.35);
    assert_eq!(config.target_mode, TargetMode::Engagement);
    assert_eq!(config.winsor_lower_pct, 5.0);
    assert_eq!(config.winsor_upper_pct, 95.0);
    assert_eq!(config.cv_folds, 3);
    assert_eq!(config.seed, 7);
    assert_eq!(config.min_samples, 10);
    assert_eq!(config.min_pairs, 20);
    assert_eq!(config.min_bucket_samples, 4);
    assert!(cli.bundle);
}

#[test]
fn test_cli_output_dir_derivation() {
    let cli = Cli::parse_from(["hookstat", "-i", "/path/to/posts.csv"]);
    assert_eq!(
        cli.output_dir().unwrap(),
        PathBuf::from("/path/to/posts_hook_analysis")
    );

    let cli = Cli::parse_from(["hookstat", "-i", "posts.csv", "-o", "out"]);
    assert_eq!(cli.output_dir().unwrap(), PathBuf::from("out"));
}

#[test]
fn test_cli_rejects_invalid_values() {
    assert!(Cli::try_parse_from(["hookstat", "-i", "posts.csv", "--folds", "1"]).is_err());
    assert!(Cli::try_parse_from(["hookstat", "-i", "posts.csv", "--beta", "-0.2"]).is_err());
    assert!(Cli::try_parse_from(["hookstat", "-i", "posts.csv", "--winsor-upper", "120"]).is_err());
    assert!(Cli::try_parse_from(["hookstat", "-i", "posts.csv", "--target", "likes"]).is_err());
}

#[test]
fn test_cli_inverted_winsor_bounds_fail_validation() {
    let cli = Cli::parse_from([
        "hookstat",
        "-i",
        "posts.csv",
        "--winsor-lower",
        "90",
        "--winsor-upper",
        "10",
    ]);
    assert!(cli.analysis_config().is_err());
}

#[test]
fn test_cli_config_file_then_flags() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("hookstat.json");
    std::fs::write(&path, r#"{"decay_beta": 0.5, "min_pairs": 10, "seed": 3}"#).unwrap();

    let cli = Cli::parse_from([
        "hookstat",
        "-i",
        "posts.csv",
        "-c",
        path.to_str().unwrap(),
        "--seed",
        "11",
    ]);
    let config = cli.analysis_config().unwrap();
    assert_eq!(config.decay_beta, 0.5);
    assert_eq!(config.min_pairs, 10);
    assert_eq!(config.seed, 11);
    assert_eq!(config.cv_folds, 5);
}

#[test]
fn test_cli_init_config_subcommand() {
    let cli = Cli::parse_from(["hookstat", "init-config"]);
    match cli.command {
        Some(Commands::InitConfig { output }) => {
            assert_eq!(output, PathBuf::from("hookstat.json"))
        }
        None => panic!("expected init-config"),
    }

    let cli = Cli::parse_from(["hookstat", "init-config", "custom.json"]);
    assert!(matches!(
        cli.command,
        Some(Commands::InitConfig { output }) if output == PathBuf::from("custom.json")
    ));
}

#[test]
fn test_binary_writes_report() {
    let mut df = create_post_frame(PostFixture::default());
    let (dir, input) = create_temp_csv(&mut df);
    let out_dir = dir.path().join("report");

    Command::cargo_bin("hookstat")
        .unwrap()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&out_dir)
        .arg("--bundle")
        .assert()
        .success()
        .stdout(predicate::str::contains("ANALYSIS SUMMARY"));

    for name in [
        "univariate.json",
        "pairwise_model.json",
        "interactions.json",
        "buckets.json",
        "report.md",
        "hook_analysis.zip",
    ] {
        assert!(out_dir.join(name).exists(), "{} not written", name);
    }
}

#[test]
fn test_binary_fails_on_missing_required_column() {
    let mut df = without_columns(&create_post_frame(PostFixture::default()), &["followers"]);
    let (dir, input) = create_temp_csv(&mut df);
    let out_dir = dir.path().join("report");

    Command::cargo_bin("hookstat")
        .unwrap()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&out_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("followers"));

    assert!(!out_dir.exists());
}

#[test]
fn test_binary_init_config_refuses_overwrite() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("hookstat.json");

    Command::cargo_bin("hookstat")
        .unwrap()
        .arg("init-config")
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    Command::cargo_bin("hookstat")
        .unwrap()
        .arg("init-config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Refusing to overwrite"));
}
