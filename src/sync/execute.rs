use super::plan::{build_cleanup_plan, CleanupPlan};
use crate::remote::RemoteFile;
use crate::store::{self, StoreError};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Result of the cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files removed because their backup is confirmed
    pub deleted: Vec<String>,
    /// Older files kept because the snapshot does not contain them
    pub kept_unconfirmed: Vec<String>,
    /// Files whose deletion failed; kept for the next run
    pub failed: Vec<String>,
}

impl CleanupReport {
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }
}

/// Plan the cleanup of `save_dir` against a remote snapshot, without touching disk
pub async fn plan_cleanup(
    save_dir: &Path,
    snapshot: &[RemoteFile],
    today_key: &str,
) -> Result<CleanupPlan, StoreError> {
    let local_names = store::list(save_dir).await?;
    let remote_titles: HashSet<String> = snapshot.iter().map(|f| f.title.clone()).collect();
    Ok(build_cleanup_plan(&local_names, &remote_titles, today_key))
}

/// Carry out a cleanup plan.
///
/// A failed delete is logged and recorded; it does not stop the pass.
pub async fn execute_cleanup(save_dir: &Path, plan: &CleanupPlan) -> CleanupReport {
    let mut report = CleanupReport::default();

    for name in &plan.unconfirmed {
        warn!(file = %name, "Keeping local file, no remote copy confirmed");
        report.kept_unconfirmed.push(name.clone());
    }

    for name in &plan.to_delete {
        match store::delete(&save_dir.join(name)).await {
            Ok(true) => {
                info!(file = %name, "Deleted local file already synced");
                report.deleted.push(name.clone());
            }
            Ok(false) => {
                debug!(file = %name, "Local file already gone, nothing to delete");
            }
            Err(e) => {
                warn!(file = %name, error = %e, "Failed to delete local file");
                report.failed.push(name.clone());
            }
        }
    }

    report
}

/// Plan and execute in one step
pub async fn reconcile(
    save_dir: &Path,
    snapshot: &[RemoteFile],
    today_key: &str,
) -> Result<CleanupReport, StoreError> {
    let plan = plan_cleanup(save_dir, snapshot, today_key).await?;
    Ok(execute_cleanup(save_dir, &plan).await)
}
