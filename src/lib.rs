pub mod auth;
pub mod config;
pub mod naming;
pub mod remote;
pub mod store;
pub mod sync;
pub mod utils;

// Re-export commonly used types
pub use auth::{authenticate, resolve_oauth_client, AuthError, Credentials, OAuthClient};
pub use config::{read_config, read_required_config, ConfigError, ConfigLayer, SyncConfig};
pub use naming::{
    date_key, date_prefix, local_filename, remote_filename, today, variant_tag, yesterday, Edition,
    NamingError,
};
pub use remote::{DriveClient, RemoteError, RemoteFile, RemoteStore};
pub use store::{DownloadError, Fetcher, HttpFetcher, StoreError};
pub use sync::{
    build_cleanup_plan, reconcile, run_sync, run_sync_connecting, sync_local, sync_remote,
    CleanupOutcome, CleanupPlan, CleanupReport, LocalStatus, LocalSync, RemoteStatus, SyncError,
    SyncReport,
};
