pub mod json;
pub mod junit;

use crate::runner::orchestrator::SuiteRun;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Write every report for a finished suite into `output_dir`.
/// Returns the paths written.
pub fn write_reports(run: &SuiteRun, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut written = vec![
        json::write_results(&run.result, output_dir)?,
        junit::write_report(&run.result, output_dir)?,
    ];
    written.extend(json::write_healing_log(&run.healed, output_dir)?);
    Ok(written)
}
