//! File operations for the memory store
//!
//! Handles slugification, whole-file writes, category listing and disk usage.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Slugify a name for use as a filename (e.g. "Favorite Editor" -> "favorite-editor")
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<&str>>()
        .join("-")
}

/// Replace a memory file in one step: write a hidden sibling, then rename over
/// the target. Creates parent directories as needed.
pub fn write_memory(path: &Path, content: &str) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp_path = parent.join(format!(".{}.tmp", file_name));

    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp_path);
    })
}

/// Read a memory file
pub fn read_memory(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
}

/// List the markdown files directly inside a category directory, sorted by name.
/// A missing directory lists as empty.
pub fn list_category(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        // Skip hidden files (in-flight writes)
        if path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }
        if path.is_file() && path.extension().map(|e| e == "md").unwrap_or(false) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Get relative path from the store root for a file
pub fn relative_path(root: &Path, file_path: &Path) -> Option<String> {
    file_path
        .strip_prefix(root)
        .ok()
        .map(|p| p.to_string_lossy().to_string())
}

/// Total size in bytes of every file under `root`
pub fn disk_usage(root: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file() {
            total += entry.metadata().map_err(io::Error::other)?.len();
        }
    }
    Ok(total)
}
