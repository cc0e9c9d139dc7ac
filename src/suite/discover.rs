//! Spec file discovery
//!
//! Used when no `--spec` list is given.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Recursively collect `*.yaml` / `*.yml` files under `dir`, sorted by path
pub fn discover_spec_files(dir: impl AsRef<Path>) -> Vec<PathBuf> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        warn!("Spec directory {} does not exist", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable spec entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|e| e == "yaml" || e == "yml")
                .unwrap_or(false)
        })
        .collect();

    files.sort();
    files
}
