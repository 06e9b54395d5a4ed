//! hookstat: Hook Performance Analysis CLI
//!
//! Reads a CSV or Parquet export of short-form-video posts and writes four JSON
//! tables plus a markdown report ranking the strongest hook findings.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hookstat::cli::{run_init_config, Cli, Commands};
use hookstat::pipeline::{ingest_dataframe, load_dataset_with_progress, run_analysis};
use hookstat::report::{package_artifacts, render_report, write_artifacts, BUNDLE_FILE};
use hookstat::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_success, print_warning,
};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::InitConfig { output } => run_init_config(output),
        };
    }

    let input = cli.input().ok_or_else(|| {
        anyhow::anyhow!("Input file is required. Use -i/--input to specify a file.")
    })?;
    let output_dir = cli
        .output_dir()
        .context("Could not derive an output directory from the input path")?;
    let config = cli.analysis_config()?;

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(input, &output_dir, &config);
    let run_start = Instant::now();

    // Step 1: Load, validate and normalize
    print_step_header(1, "Load & Normalize");
    let (df, rows, cols, memory_mb) = load_dataset_with_progress(input, cli.infer_schema_length)?;
    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);

    let spinner = create_spinner("Validating columns and normalizing the target...");
    let dataset = match ingest_dataframe(&df, &config) {
        Ok(dataset) => dataset,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.context(format!("Cannot analyze {}", input.display())));
        }
    };
    drop(df);
    finish_with_success(&spinner, "Target normalized and winsorized");

    let notes = dataset.notes();
    if notes.rows_dropped > 0 {
        print_warning(&format!(
            "{} row(s) dropped for lacking a {} value",
            notes.rows_dropped,
            dataset.target_mode()
        ));
    }
    for correction in &notes.scale_corrections {
        print_warning(&format!(
            "{} looked like a percentage and was divided by 100",
            correction.feature
        ));
    }
    print_count(
        "hook features found",
        dataset.features().available().len(),
        Some(
            format!(
                "({} accounts, {} posting weeks)",
                dataset.account_count(),
                dataset.week_count()
            )
            .as_str(),
        ),
    );
    if !dataset.features().unavailable().is_empty() {
        print_info(&format!(
            "Not in input, tests will be skipped: {}",
            dataset.features().unavailable().join(", ")
        ));
    }

    // Step 2: Analyzers
    print_step_header(2, "Correlations, Pairwise Model, Interactions, Buckets");
    let spinner = create_spinner("Running analyzers...");
    let results = run_analysis(&dataset, &config);
    let skipped = results.skipped_tests().len();
    if skipped == 0 {
        finish_with_success(
            &spinner,
            &format!("{} tests computed", results.computed_count()),
        );
    } else {
        finish_with_warning(
            &spinner,
            &format!(
                "{} tests computed, {} skipped (see report)",
                results.computed_count(),
                skipped
            ),
        );
    }

    // Step 3: Report
    print_step_header(3, "Report");
    let spinner = create_spinner("Rendering tables and narrative...");
    let report = render_report(input, &dataset, &results, &config)?;
    let written = write_artifacts(&output_dir, &report.artifacts)?;
    finish_with_success(&spinner, &format!("{} files written", written.len()));
    for path in &written {
        print_info(&path.display().to_string());
    }

    if cli.bundle {
        let zip_path = output_dir.join(BUNDLE_FILE);
        package_artifacts(&report.artifacts, &zip_path)?;
        print_success(&format!("Bundled into {}", zip_path.display()));
    }

    report.summary.display();
    print_info(&format!(
        "Finished in {:.2}s",
        run_start.elapsed().as_secs_f64()
    ));
    print_completion();
    Ok(())
}
