//! Full-tree backups of an installation directory.
//!
//! A backup is a plain directory copy under the temp directory named
//! `lmstudio-backup-<unix-ms>`. Backups are never cleaned up automatically.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::fs_utils::copy_dir_recursive;

/// Prefix of every backup directory name
pub const BACKUP_PREFIX: &str = "lmstudio-backup-";

/// Directory name of a backup taken at `timestamp_ms`
pub fn backup_dir_name(timestamp_ms: i64) -> String {
    format!("{}{}", BACKUP_PREFIX, timestamp_ms)
}

/// Copy `source` into a fresh timestamped directory under `temp_dir`.
///
/// Returns the backup directory. On failure whatever was already copied
/// stays on disk.
pub fn create_backup(source: &Path, temp_dir: &Path) -> Result<PathBuf> {
    let backup_dir = unused_backup_dir(temp_dir, Utc::now().timestamp_millis());
    tracing::info!(
        source = %source.display(),
        backup = %backup_dir.display(),
        "creating backup"
    );

    copy_dir_recursive(source, &backup_dir).with_context(|| {
        format!(
            "Failed to back up {} to {}",
            source.display(),
            backup_dir.display()
        )
    })?;

    Ok(backup_dir)
}

/// Copy a backup back over `target`, overwriting existing files.
///
/// The backup itself is kept.
pub fn restore_backup(backup_dir: &Path, target: &Path) -> Result<()> {
    tracing::info!(
        backup = %backup_dir.display(),
        target = %target.display(),
        "restoring backup"
    );

    copy_dir_recursive(backup_dir, target).with_context(|| {
        format!(
            "Failed to restore {} from {}",
            target.display(),
            backup_dir.display()
        )
    })
}

// Two backups started within the same millisecond get consecutive stamps.
fn unused_backup_dir(temp_dir: &Path, mut timestamp_ms: i64) -> PathBuf {
    loop {
        let candidate = temp_dir.join(backup_dir_name(timestamp_ms));
        if fs_entry_missing(&candidate) {
            return candidate;
        }
        timestamp_ms += 1;
    }
}

fn fs_entry_missing(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_err()
}
