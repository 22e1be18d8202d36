use super::types::Flow;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Parse a YAML flow file
pub fn parse_flow_file(path: &Path) -> Result<Flow> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    parse_flow_content(&content, path)
}

/// Parse YAML content into a validated Flow
///
/// The flow name falls back to the file stem when the document doesn't set one.
pub fn parse_flow_content(content: &str, source_path: &Path) -> Result<Flow> {
    let mut flow: Flow = serde_yaml::from_str(content)
        .with_context(|| format!("Failed to parse flow: {}", source_path.display()))?;

    if flow.name.trim().is_empty() {
        flow.name = source_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
    }

    flow.validate().map_err(anyhow::Error::msg)?;
    Ok(flow)
}

/// Collect flow files from a file or directory, sorted so suite order is stable
pub fn collect_flow_files(path: &Path) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .map_or(false, |ext| ext == "yaml" || ext == "yml")
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

/// Load every flow under `path`, failing on the first invalid file
pub fn load_flows(path: &Path) -> Result<Vec<Flow>> {
    collect_flow_files(path)
        .iter()
        .map(|file| parse_flow_file(file))
        .collect()
}
