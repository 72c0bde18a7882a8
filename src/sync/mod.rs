//! The daily sync run.
//!
//! Steps, in order:
//! 1. make sure today's PDF is on disk, downloading it if needed;
//! 2. take one listing of the remote folder and upload today's file if the
//!    listing does not contain it;
//! 3. reuse that same listing to delete older local files whose backup it
//!    confirms.
//!
//! Download and upload failures end the run. A failed listing or a missing
//! save directory only costs this run's cleanup.

mod execute;
mod plan;

pub use execute::{execute_cleanup, plan_cleanup, reconcile, CleanupReport};
pub use plan::{build_cleanup_plan, CleanupPlan};

use crate::auth::AuthError;
use crate::config::SyncConfig;
use crate::naming::{self, NamingError};
use crate::remote::{RemoteError, RemoteFile, RemoteStore};
use crate::store::{self, DownloadError, Fetcher, StoreError};
use chrono::NaiveDate;
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

/// Failures that end the run
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Naming error: {0}")]
    NamingError(#[from] NamingError),

    #[error("Download failed: {0}")]
    DownloadError(#[from] DownloadError),

    #[error("Authentication failed: {0}")]
    AuthError(#[from] AuthError),

    #[error("Upload failed: {0}")]
    UploadError(RemoteError),

    #[error("Local storage error: {0}")]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalStatus {
    AlreadyPresent,
    Downloaded { bytes: u64 },
    /// Dry run: the file is missing and would be downloaded
    WouldDownload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    AlreadySynced { id: String },
    Uploaded { id: String },
    /// Dry run: the file is missing remotely and would be uploaded
    WouldUpload,
    /// The upload check could not run; retried on the next run
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Completed(CleanupReport),
    /// Dry run: what would have been deleted
    Planned(CleanupPlan),
    Skipped { reason: String },
}

/// Everything one run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub date: NaiveDate,
    pub local_filename: String,
    pub local: LocalStatus,
    pub remote: RemoteStatus,
    pub cleanup: CleanupOutcome,
}

impl SyncReport {
    /// Number of local files deleted by the cleanup pass
    pub fn deleted_count(&self) -> usize {
        match &self.cleanup {
            CleanupOutcome::Completed(report) => report.deleted_count(),
            _ => 0,
        }
    }
}

/// Outcome of the local step, carried into the remote step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSync {
    pub date: NaiveDate,
    pub local_filename: String,
    pub local_path: PathBuf,
    pub status: LocalStatus,
}

/// Run one sync for `today` against an already connected remote store
pub async fn run_sync(
    config: &SyncConfig,
    today: NaiveDate,
    fetcher: &dyn Fetcher,
    remote: &dyn RemoteStore,
) -> Result<SyncReport, SyncError> {
    let local = sync_local(config, today, fetcher).await?;
    sync_remote(config, local, remote).await
}

/// Run one sync, connecting to the remote store only after the local step.
///
/// Today's PDF is saved even when `connect` fails; the connect error still
/// ends the run.
pub async fn run_sync_connecting<F, Fut, R>(
    config: &SyncConfig,
    today: NaiveDate,
    fetcher: &dyn Fetcher,
    connect: F,
) -> Result<SyncReport, SyncError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, SyncError>>,
    R: RemoteStore,
{
    let local = sync_local(config, today, fetcher).await?;
    let remote = connect().await.map_err(|e| {
        error!(error = %e, "Could not connect to remote store");
        e
    })?;
    sync_remote(config, local, &remote).await
}

/// Step 1: make sure today's PDF is on disk
pub async fn sync_local(
    config: &SyncConfig,
    today: NaiveDate,
    fetcher: &dyn Fetcher,
) -> Result<LocalSync, SyncError> {
    let variant = naming::variant_tag(today);
    let remote_name = naming::remote_filename(variant, today);
    let local_name = naming::local_filename(&remote_name)?;
    let local_path = config.local_path(&local_name);

    info!(
        date = %today,
        previous = ?naming::yesterday(today),
        file = %local_name,
        dry_run = config.dry_run,
        "Starting sync"
    );

    let status = ensure_local(config, fetcher, &remote_name, &local_path).await?;

    Ok(LocalSync {
        date: today,
        local_filename: local_name,
        local_path,
        status,
    })
}

/// Steps 2 and 3: upload if missing, then clean up against one listing
pub async fn sync_remote(
    config: &SyncConfig,
    local: LocalSync,
    remote: &dyn RemoteStore,
) -> Result<SyncReport, SyncError> {
    // One listing per run, shared by the upload check and the cleanup pass
    let snapshot = match remote.list_files(&config.folder_id).await {
        Ok(files) => files,
        Err(e) => {
            error!(error = %e, "Could not list remote folder, skipping upload and cleanup");
            let reason = e.to_string();
            return Ok(SyncReport {
                date: local.date,
                local_filename: local.local_filename,
                local: local.status,
                remote: RemoteStatus::Skipped {
                    reason: reason.clone(),
                },
                cleanup: CleanupOutcome::Skipped { reason },
            });
        }
    };

    let remote_status = ensure_remote(
        config,
        remote,
        &snapshot,
        &local.local_filename,
        &local.local_path,
    )
    .await?;
    let cleanup = run_cleanup(config, &snapshot, &naming::date_key(local.date)).await;

    Ok(SyncReport {
        date: local.date,
        local_filename: local.local_filename,
        local: local.status,
        remote: remote_status,
        cleanup,
    })
}

async fn ensure_local(
    config: &SyncConfig,
    fetcher: &dyn Fetcher,
    remote_name: &str,
    local_path: &Path,
) -> Result<LocalStatus, SyncError> {
    if store::exists(local_path).await {
        info!(path = %local_path.display(), "File already exists locally");
        return Ok(LocalStatus::AlreadyPresent);
    }

    let url = config.source_url(remote_name);
    if config.dry_run {
        info!(url = %url, "Dry run: would download");
        return Ok(LocalStatus::WouldDownload);
    }

    store::ensure_directory(&config.save_dir).await?;
    match store::download(fetcher, &url, local_path).await {
        Ok(bytes) => {
            info!(url = %url, bytes, "Downloaded file");
            Ok(LocalStatus::Downloaded { bytes })
        }
        Err(e) => {
            error!(url = %url, error = %e, "Error downloading file");
            Err(e.into())
        }
    }
}

async fn ensure_remote(
    config: &SyncConfig,
    remote: &dyn RemoteStore,
    snapshot: &[RemoteFile],
    local_name: &str,
    local_path: &Path,
) -> Result<RemoteStatus, SyncError> {
    if let Some(existing) = snapshot.iter().find(|f| f.title == local_name) {
        info!(file = %local_name, id = %existing.id, "File already exists in remote folder");
        return Ok(RemoteStatus::AlreadySynced {
            id: existing.id.clone(),
        });
    }

    if config.dry_run {
        info!(file = %local_name, "Dry run: would upload");
        return Ok(RemoteStatus::WouldUpload);
    }

    let id = remote
        .upload_file(&config.folder_id, local_path, local_name)
        .await
        .map_err(|e| {
            error!(file = %local_name, error = %e, "Upload failed");
            SyncError::UploadError(e)
        })?;

    info!(file = %local_name, id = %id, "File uploaded to remote folder");
    Ok(RemoteStatus::Uploaded { id })
}

async fn run_cleanup(config: &SyncConfig, snapshot: &[RemoteFile], today_key: &str) -> CleanupOutcome {
    let plan = match plan_cleanup(&config.save_dir, snapshot, today_key).await {
        Ok(plan) => plan,
        Err(e) => {
            warn!(dir = %config.save_dir.display(), error = %e, "Skipping cleanup");
            return CleanupOutcome::Skipped {
                reason: e.to_string(),
            };
        }
    };

    if config.dry_run {
        for name in &plan.to_delete {
            info!(file = %name, "Dry run: would delete");
        }
        for name in &plan.unconfirmed {
            warn!(file = %name, "Dry run: would keep, no remote copy confirmed");
        }
        return CleanupOutcome::Planned(plan);
    }

    let report = execute_cleanup(&config.save_dir, &plan).await;
    info!(
        deleted = report.deleted_count(),
        kept = report.kept_unconfirmed.len(),
        "Cleanup finished"
    );
    CleanupOutcome::Completed(report)
}
