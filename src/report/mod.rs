//! Report module - structured tables, narrative and console summary

pub mod findings;
pub mod narrative;
pub mod summary;
pub mod tables;

pub use findings::*;
pub use narrative::*;
pub use summary::*;
pub use tables::*;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::pipeline::{AnalysisConfig, AnalysisResults, NormalizedDataset};

pub const NARRATIVE_FILE: &str = "report.md";
pub const BUNDLE_FILE: &str = "hook_analysis.zip";

/// One rendered output file
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub contents: String,
}

/// Everything a run produces, rendered in memory
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub artifacts: Vec<Artifact>,
    pub findings: Vec<Finding>,
    pub summary: RunSummary,
}

/// Render the four tables and the narrative without touching the filesystem
pub fn render_report(
    input: &Path,
    dataset: &NormalizedDataset,
    results: &AnalysisResults,
    config: &AnalysisConfig,
) -> Result<RenderedReport> {
    let metadata = ReportMetadata::new(input, config, chrono::Utc::now().to_rfc3339());
    let dataset_summary = DatasetSummary::from_dataset(dataset);
    let findings = rank_findings(results, config);

    let mut artifacts: Vec<Artifact> = render_tables(&metadata, &dataset_summary, results)?
        .into_iter()
        .map(|(name, contents)| Artifact {
            file_name: name.to_string(),
            contents,
        })
        .collect();
    artifacts.push(Artifact {
        file_name: NARRATIVE_FILE.to_string(),
        contents: render_narrative(&metadata, &dataset_summary, results, &findings),
    });

    let summary = RunSummary::new(&dataset_summary, results, &findings);
    Ok(RenderedReport {
        artifacts,
        findings,
        summary,
    })
}

/// Write rendered artifacts into `out_dir`, creating it if needed
pub fn write_artifacts(out_dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    artifacts
        .iter()
        .map(|artifact| {
            let path = out_dir.join(&artifact.file_name);
            std::fs::write(&path, &artifact.contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

/// Package rendered artifacts into a single zip archive
pub fn package_artifacts(artifacts: &[Artifact], zip_path: &Path) -> Result<()> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    let zip_file = std::fs::File::create(zip_path)
        .with_context(|| format!("Failed to create zip file: {}", zip_path.display()))?;

    let mut zip = ZipWriter::new(zip_file);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for artifact in artifacts {
        zip.start_file(artifact.file_name.as_str(), options)
            .with_context(|| format!("Failed to add {} to zip", artifact.file_name))?;
        zip.write_all(artifact.contents.as_bytes())?;
    }

    zip.finish().context("Failed to finalize zip file")?;
    Ok(())
}
