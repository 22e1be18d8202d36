use crate::locator::HealedSelector;
use crate::runner::state::SuiteResult;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Write the suite result as `results.json`
pub fn write_results(suite: &SuiteResult, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join("results.json");
    let json = serde_json::to_string_pretty(suite)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Persist the run's healed selectors; nothing is written for an empty log
pub fn write_healing_log(healed: &[HealedSelector], output_dir: &Path) -> Result<Option<PathBuf>> {
    if healed.is_empty() {
        return Ok(None);
    }
    let path = output_dir.join("healed-selectors.json");
    let json = serde_json::to_string_pretty(healed)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(Some(path))
}
