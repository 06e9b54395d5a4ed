//! `init-config` subcommand: write the default configuration for editing

use std::path::Path;

use anyhow::{bail, Result};
use console::style;

use crate::pipeline::AnalysisConfig;

/// Write the default [`AnalysisConfig`] as pretty JSON.
///
/// Refuses to overwrite an existing file.
pub fn run_init_config(output: &Path) -> Result<()> {
    if output.exists() {
        bail!(
            "Refusing to overwrite existing file: {}",
            output.display()
        );
    }

    AnalysisConfig::default().write_json_file(output)?;

    println!(
        "\n {} Wrote default configuration",
        style("◆").cyan().bold()
    );
    println!("   Output: {}", style(output.display()).dim());
    println!(
        "   Edit it, then run: hookstat -i <input> --config {}",
        output.display()
    );
    println!();
    Ok(())
}
