//! On-disk credential cache.

use super::{AuthError, Credentials};
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

/// Read cached credentials, `None` when no cache exists yet
pub async fn load_credentials(path: &Path) -> Result<Option<Credentials>, AuthError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let mode = fs::metadata(path).await?.mode() & 0o777;
        if mode & 0o077 != 0 {
            warn!(
                path = %path.display(),
                mode = format!("{:o}", mode),
                "Credentials file is readable by other users"
            );
        }
    }

    let credentials: Credentials = serde_json::from_str(&content)?;
    debug!(path = %path.display(), "Loaded cached credentials");
    Ok(Some(credentials))
}

/// Write credentials atomically (temp file + rename), owner-only on Unix
pub async fn save_credentials(path: &Path, credentials: &Credentials) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let temp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(credentials)?;
    fs::write(&temp_path, &content).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600)).await?;
    }

    fs::rename(&temp_path, path).await?;
    debug!(path = %path.display(), "Saved credentials");
    Ok(())
}
