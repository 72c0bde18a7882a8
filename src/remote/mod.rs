//! Remote backup store.
//!
//! The sync core only needs two calls from the provider: list the files in a
//! folder, and upload a file into it. Each call either succeeds or fails as a
//! whole; the core never sees partial listings.

mod drive;

pub use drive::{DriveClient, DRIVE_API_BASE, DRIVE_UPLOAD_BASE};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Failed to list folder {folder_id}: {message}")]
    List { folder_id: String, message: String },

    #[error("Failed to upload {title}: {message}")]
    Upload { title: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A file in the remote folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub title: String,
    pub id: String,
    pub parent_id: Option<String>,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Every non-trashed file directly inside `folder_id`
    async fn list_files(&self, folder_id: &str) -> Result<Vec<RemoteFile>, RemoteError>;

    /// Upload `local_path` into `folder_id` under `title`, returning the new file id
    async fn upload_file(
        &self,
        folder_id: &str,
        local_path: &Path,
        title: &str,
    ) -> Result<String, RemoteError>;
}
