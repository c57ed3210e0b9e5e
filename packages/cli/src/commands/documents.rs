//! Reading and writing JSON documents

use crate::config::DEFAULT_CONFIG_NAME;
use anyhow::{anyhow, Context, Result};
use folio_model::Resource;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn load_document(path: &Path) -> Result<Resource> {
    let source = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let document = serde_json::from_str(&source).with_context(|| format!("Cannot parse {}", path.display()))?;
    Ok(document)
}

pub fn save_document(path: &Path, document: &Resource) -> Result<()> {
    let mut json = serde_json::to_string_pretty(document)?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))?;
    Ok(())
}

/// A single file, or every `.json` document under a directory
pub fn find_documents(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(anyhow!("Input path does not exist: {}", input.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
        let is_config = path.file_name().map(|n| n == DEFAULT_CONFIG_NAME).unwrap_or(false);
        if path.is_file() && is_json && !is_config {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}
