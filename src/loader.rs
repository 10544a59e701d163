use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use glob::Pattern;
use serde_json::Value;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::utils::{read_text_best_effort, strip_fields};

fn is_ignored(rel: &Path) -> bool {
    let name = rel.file_name().and_then(|s| s.to_str()).unwrap_or("");
    name.starts_with('.') || ["__pycache__", "node_modules"].contains(&name)
}

/// `*.json` files under `root`, sorted by relative path.
pub fn scan_json_files(root: &Path) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    let mut files = Vec::new();
    for entry in walker.filter_entry(|e| match e.path().strip_prefix(root) {
        Ok(rel) if rel != Path::new("") => !is_ignored(rel),
        _ => true,
    }) {
        let entry = entry.with_context(|| format!("Cannot walk {}", root.display()))?;
        let path = entry.path();
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if entry.file_type().is_file() && is_json {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

fn parse_file(path: &Path) -> Result<Value> {
    let text = read_text_best_effort(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Loads one collection: a single JSON file (returned as parsed, array or
/// not), or a directory whose JSON files each hold an array, concatenated in
/// path order. Fields matching `ignore_fields` are stripped afterwards.
pub fn load_collection(path: &Path, ignore_fields: &[Pattern]) -> Result<Value> {
    let mut collection = if path.is_dir() {
        let files = scan_json_files(path)?;
        let mut records = Vec::new();
        for file in &files {
            match parse_file(file)? {
                Value::Array(items) => {
                    debug!(file = %file.display(), records = items.len(), "loaded file");
                    records.extend(items);
                }
                other => bail!(
                    "{} holds {}, expected an array of objects",
                    file.display(),
                    crate::record::json_type_name(&other)
                ),
            }
        }
        info!(dir = %path.display(), files = files.len(), records = records.len(), "loaded directory");
        Value::Array(records)
    } else {
        let value = parse_file(path)?;
        info!(
            file = %path.display(),
            records = value.as_array().map_or(0, Vec::len),
            "loaded file"
        );
        value
    };
    strip_fields(&mut collection, ignore_fields);
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_and_tooling_dirs_are_ignored() {
        assert!(is_ignored(Path::new("a/.git")));
        assert!(is_ignored(Path::new(".hidden.json")));
        assert!(is_ignored(Path::new("x/node_modules")));
        assert!(!is_ignored(Path::new("data/users.json")));
    }
}
