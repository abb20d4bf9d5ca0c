//! Filesystem helpers for the browse and transfer commands.
//!
//! These are independent of the command-execution core. The traversal
//! guards assume a single trusted operator and exist to catch mistakes,
//! not adversaries.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Sorted directory listing, one entry per line, directories marked ` D`
/// and files ` F`. Empty string for an empty directory.
pub fn list_dir(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::NotFound(path.display().to_string()));
    }
    if !path.is_dir() {
        return Err(Error::Validation(format!(
            "not a directory: {}",
            path.display()
        )));
    }

    let mut names: Vec<String> = fs::read_dir(path)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    let mut lines = Vec::with_capacity(names.len());
    for name in names {
        let prefix = if path.join(&name).is_dir() { " D" } else { " F" };
        lines.push(format!("{prefix} {name}"));
    }
    Ok(lines.join("\n"))
}

/// True if the path string contains a `..` component.
pub fn has_parent_components(path: &str) -> bool {
    Path::new(path)
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
}

/// Resolve `requested` against `base` and verify the result stays inside
/// `base`. The target must exist and be a regular file.
pub fn resolve_within(base: &Path, requested: &str) -> Result<PathBuf> {
    let joined = if Path::new(requested).is_absolute() {
        PathBuf::from(requested)
    } else {
        base.join(requested)
    };

    let canonical = fs::canonicalize(&joined).map_err(|_| Error::NotFound(requested.to_string()))?;
    let canonical_base = fs::canonicalize(base)?;
    if !canonical.starts_with(&canonical_base) {
        return Err(Error::PathEscape(requested.to_string()));
    }
    if !canonical.is_file() {
        return Err(Error::Validation(format!("not a file: {requested}")));
    }
    Ok(canonical)
}

/// Reduce an incoming upload filename to its basename.
pub fn sanitize_upload_name(name: &str) -> Result<String> {
    let safe = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if safe.is_empty() || safe == ".." {
        return Err(Error::Validation(format!("invalid filename: {name}")));
    }
    Ok(safe)
}
