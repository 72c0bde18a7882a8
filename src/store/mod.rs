//! The local download directory.

mod fetch;

pub use fetch::{DownloadError, Fetcher, HttpFetcher};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Suffix for in-flight downloads; renamed away once the write completes
const PARTIAL_SUFFIX: &str = "part";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to list directory: {0}")]
    WalkError(#[from] walkdir::Error),
}

/// True iff a regular file exists at `path`
pub async fn exists(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Create `path` and its parents if they are missing
pub async fn ensure_directory(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(path).await?;
    Ok(())
}

/// Fetch `url` and store the body at `destination`.
///
/// The body is written to a `.part` sibling first and renamed into place, so an
/// interrupted run never leaves a truncated PDF under the final name.
pub async fn download(
    fetcher: &dyn Fetcher,
    url: &str,
    destination: &Path,
) -> Result<u64, DownloadError> {
    let bytes = fetcher.fetch(url).await?;

    let temp_path = partial_path(destination);
    let write_err = |source| DownloadError::Write {
        path: destination.to_path_buf(),
        source,
    };

    if let Err(e) = fs::write(&temp_path, &bytes).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(write_err(e));
    }
    fs::rename(&temp_path, destination).await.map_err(write_err)?;

    debug!(url, path = %destination.display(), bytes = bytes.len(), "Download stored");
    Ok(bytes.len() as u64)
}

/// Remove the file at `path`. Returns whether anything was removed.
pub async fn delete(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Names of the regular files directly inside `directory`, sorted
pub async fn list(directory: &Path) -> Result<Vec<String>, StoreError> {
    match fs::metadata(directory).await {
        Ok(m) if m.is_dir() => {}
        Ok(_) => return Err(StoreError::DirectoryNotFound(directory.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::DirectoryNotFound(directory.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }

    names.sort();
    Ok(names)
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    destination.with_file_name(name)
}
