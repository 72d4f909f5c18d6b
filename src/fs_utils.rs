//! Filesystem utility functions
//!
//! Tree copy and sizing used by the backup manager.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively calculate the total size of a directory in bytes
///
/// Symbolic links are not followed.
pub fn dir_size(path: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
        if entry.file_type().is_file() {
            total += entry
                .metadata()
                .with_context(|| format!("Failed to read metadata for {}", entry.path().display()))?
                .len();
        }
    }
    Ok(total)
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Copy the contents of `src` into `dst`, overwriting files that already exist
///
/// `dst` is created if missing. Entries in `dst` that have no counterpart in
/// `src` are left untouched. Symbolic links are copied as links on Unix and
/// as the file they point to elsewhere.
///
/// # Errors
/// Returns an error if:
/// - Source doesn't exist or is not a directory
/// - Any directory cannot be created or any file cannot be copied
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    if !src.exists() {
        bail!("Source directory does not exist: {:?}", src);
    }

    if !src.is_dir() {
        bail!("Source is not a directory: {:?}", src);
    }

    fs::create_dir_all(dst)
        .with_context(|| format!("Failed to create destination directory: {:?}", dst))?;

    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to read source directory: {:?}", src))?;
        let rel_path = entry
            .path()
            .strip_prefix(src)
            .context("Walked entry outside source directory")?;
        let dst_path = dst.join(rel_path);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&dst_path)
                .with_context(|| format!("Failed to create directory: {:?}", dst_path))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &dst_path)?;
        } else {
            fs::copy(entry.path(), &dst_path).with_context(|| {
                format!("Failed to copy file: {:?} -> {:?}", entry.path(), dst_path)
            })?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target =
        fs::read_link(src).with_context(|| format!("Failed to read symlink: {:?}", src))?;

    if fs::symlink_metadata(dst).is_ok() {
        fs::remove_file(dst)
            .with_context(|| format!("Failed to replace existing entry: {:?}", dst))?;
    }

    std::os::unix::fs::symlink(&target, dst)
        .with_context(|| format!("Failed to create symlink: {:?} -> {:?}", dst, target))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    if src.is_dir() {
        copy_dir_recursive(src, dst)
    } else {
        fs::copy(src, dst)
            .map(|_| ())
            .with_context(|| format!("Failed to copy file: {:?} -> {:?}", src, dst))
    }
}
