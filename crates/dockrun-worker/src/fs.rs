//! Filesystem primitives used by the lifecycle hooks.
//!
//! All of them are idempotent: running them twice leaves the same state as
//! running them once.

use std::io::ErrorKind;
use std::path::Path;

use serde_json::Value;
use tokio::fs;
use tracing::debug;

use crate::error::TaskError;

/// Create `path` and any missing parents. Succeeds if it already exists.
pub async fn ensure_directory(path: &Path) -> Result<(), TaskError> {
    debug!(path = %path.display(), "Ensuring directory");
    fs::create_dir_all(path)
        .await
        .map_err(|e| TaskError::filesystem(path, e))
}

/// Leave `path` as an existing, empty directory.
///
/// Entries are removed one by one so the directory itself keeps its identity
/// (it may be a bind mount).
pub async fn clear_directory(path: &Path) -> Result<(), TaskError> {
    debug!(path = %path.display(), "Clearing directory");
    let mut entries = match fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return ensure_directory(path).await,
        Err(e) => return Err(TaskError::filesystem(path, e)),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| TaskError::filesystem(path, e))?
    {
        let entry_path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| TaskError::filesystem(&entry_path, e))?;
        let removed = if file_type.is_dir() {
            fs::remove_dir_all(&entry_path).await
        } else {
            fs::remove_file(&entry_path).await
        };
        removed.map_err(|e| TaskError::filesystem(&entry_path, e))?;
    }
    Ok(())
}

/// Serialize `config` once and write the same bytes to every path.
pub async fn write_config(config: &Value, paths: &[&Path]) -> Result<(), TaskError> {
    let bytes = serde_json::to_vec(config)?;
    for path in paths {
        debug!(path = %path.display(), bytes = bytes.len(), "Writing task configuration");
        fs::write(path, &bytes)
            .await
            .map_err(|source| TaskError::ConfigWrite {
                path: path.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}

/// Delete a task root and everything below it. Succeeds if it is already gone.
pub async fn remove_tree(path: &Path) -> Result<(), TaskError> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TaskError::filesystem(path, e)),
    }
}
