//! Atomic file replacement.
//!
//! Writes go to a temporary file in the same directory, are synced to disk,
//! and then renamed over the target. Rename is atomic on POSIX when source
//! and destination share a filesystem; on Windows the existing target is
//! removed first, which narrows but does not eliminate the window.

use crate::error::{LatchError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically replace `path` with `content`.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            LatchError::UserError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path);
    write_and_sync(&temp_path, content)?;

    #[cfg(windows)]
    if path.exists() {
        let _ = fs::remove_file(path);
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        LatchError::UserError(format!(
            "failed to replace '{}': {}",
            path.display(),
            e
        ))
    })
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "latch".to_string());
    let temp_name = format!(".{}.tmp", file_name);
    match path.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    }
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        LatchError::UserError(format!(
            "failed to create temp file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).and_then(|_| file.sync_all()).map_err(|e| {
        let _ = fs::remove_file(path);
        LatchError::UserError(format!(
            "failed to write temp file '{}': {}",
            path.display(),
            e
        ))
    })
}
