//! Path helpers for test inputs and scratch output trees.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use walkdir::WalkDir;

/// `<root>/<YYYY>/<YYYYMMDD>`, the layout of both input and output trees.
pub fn day_dir(root: &Path, day: NaiveDate) -> PathBuf {
    root.join(format!("{:04}", day.year()))
        .join(day.format("%Y%m%d").to_string())
}

/// Every regular file under `root`, relative and sorted.
///
/// Leftover temp files (`.quicklook-*.tmp`) are included on purpose.
pub fn list_tree(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    files
}
