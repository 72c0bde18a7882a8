use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Where the daily PDFs are published
pub const DEFAULT_BASE_URL: &str = "https://crosswords-static.guim.co.uk/";

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const DEFAULT_SAVE_DIR: &str = "crosswords";
const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
const DEFAULT_CLIENT_SECRETS_FILE: &str = "client_secrets.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("No Drive folder id configured (set CROSSWORD_DRIVE_FOLDER_ID)")]
    MissingFolderId,

    #[error("Base URL must be http(s): {0}")]
    InvalidBaseUrl(String),

    #[error("Timeout must be at least one second")]
    InvalidTimeout,
}

/// One layer of optional settings.
///
/// The JSON config file deserializes into this, and the command line builds
/// one too; [`SyncConfig::resolve`] stacks them over the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secrets_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ConfigLayer {
    /// Fill every unset field of `self` from `lower`
    pub fn over(self, lower: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            folder_id: self.folder_id.or(lower.folder_id),
            save_dir: self.save_dir.or(lower.save_dir),
            base_url: self.base_url.or(lower.base_url),
            credentials_path: self.credentials_path.or(lower.credentials_path),
            client_secrets_path: self.client_secrets_path.or(lower.client_secrets_path),
            client_id: self.client_id.or(lower.client_id),
            client_secret: self.client_secret.or(lower.client_secret),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
        }
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Drive folder receiving the uploads
    pub folder_id: String,
    /// Local directory holding downloaded PDFs
    pub save_dir: PathBuf,
    /// Source base URL, always ending in `/`
    pub base_url: String,
    pub credentials_path: PathBuf,
    pub client_secrets_path: PathBuf,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub timeout_secs: u64,
    /// Report what would happen without downloading, uploading or deleting
    pub dry_run: bool,
}

impl SyncConfig {
    /// Resolve a layer against defaults rooted at `base_dir`.
    ///
    /// Relative paths in the layer are kept as given.
    pub fn resolve(layer: ConfigLayer, base_dir: &Path, dry_run: bool) -> Result<Self, ConfigError> {
        let folder_id = layer
            .folder_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(ConfigError::MissingFolderId)?;

        let mut base_url = layer
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(ConfigError::InvalidBaseUrl(base_url));
        }
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let timeout_secs = layer.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(Self {
            folder_id,
            save_dir: layer
                .save_dir
                .unwrap_or_else(|| base_dir.join(DEFAULT_SAVE_DIR)),
            base_url,
            credentials_path: layer
                .credentials_path
                .unwrap_or_else(|| base_dir.join(DEFAULT_CREDENTIALS_FILE)),
            client_secrets_path: layer
                .client_secrets_path
                .unwrap_or_else(|| base_dir.join(DEFAULT_CLIENT_SECRETS_FILE)),
            client_id: layer.client_id,
            client_secret: layer.client_secret,
            timeout_secs,
            dry_run,
        })
    }

    /// URL of a file published under the source base URL
    pub fn source_url(&self, remote_filename: &str) -> String {
        format!("{}{}", self.base_url, remote_filename)
    }

    /// Local path of a file in the save directory
    pub fn local_path(&self, local_filename: &str) -> PathBuf {
        self.save_dir.join(local_filename)
    }
}

/// Read an optional JSON config file
pub async fn read_config(path: &Path) -> Result<Option<ConfigLayer>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).await?;
    let config: ConfigLayer = serde_json::from_str(&content)?;
    Ok(Some(config))
}

/// Read a config file the user asked for explicitly; a missing file is an error
pub async fn read_required_config(path: &Path) -> Result<ConfigLayer, ConfigError> {
    read_config(path)
        .await?
        .ok_or_else(|| ConfigError::NotFound(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_with_folder(id: &str) -> ConfigLayer {
        ConfigLayer {
            folder_id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let config =
            SyncConfig::resolve(layer_with_folder("folder-1"), Path::new("/opt/cw"), false).unwrap();
        assert_eq!(config.folder_id, "folder-1");
        assert_eq!(config.save_dir, Path::new("/opt/cw/crosswords"));
        assert_eq!(config.credentials_path, Path::new("/opt/cw/credentials.json"));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(
            config.source_url("gdn.quick.20240309.pdf"),
            "https://crosswords-static.guim.co.uk/gdn.quick.20240309.pdf"
        );
    }

    #[test]
    fn test_resolve_requires_folder_id() {
        assert!(matches!(
            SyncConfig::resolve(ConfigLayer::default(), Path::new("."), false),
            Err(ConfigError::MissingFolderId)
        ));
        assert!(matches!(
            SyncConfig::resolve(layer_with_folder("   "), Path::new("."), false),
            Err(ConfigError::MissingFolderId)
        ));
    }

    #[test]
    fn test_resolve_normalizes_base_url() {
        let layer = ConfigLayer {
            base_url: Some("http://mirror.local/pdfs".to_string()),
            ..layer_with_folder("f")
        };
        let config = SyncConfig::resolve(layer, Path::new("."), false).unwrap();
        assert_eq!(config.base_url, "http://mirror.local/pdfs/");

        let layer = ConfigLayer {
            base_url: Some("ftp://mirror.local/".to_string()),
            ..layer_with_folder("f")
        };
        assert!(matches!(
            SyncConfig::resolve(layer, Path::new("."), false),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_layer_precedence() {
        let cli = ConfigLayer {
            folder_id: Some("from-cli".to_string()),
            ..Default::default()
        };
        let file = ConfigLayer {
            folder_id: Some("from-file".to_string()),
            timeout_secs: Some(5),
            ..Default::default()
        };
        let merged = cli.over(file);
        assert_eq!(merged.folder_id.as_deref(), Some("from-cli"));
        assert_eq!(merged.timeout_secs, Some(5));
    }

    #[tokio::test]
    async fn test_read_config_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"folderId":"abc","timeoutSecs":30}"#).unwrap();

        let layer = read_config(&path).await.unwrap().unwrap();
        assert_eq!(layer.folder_id.as_deref(), Some("abc"));
        assert_eq!(layer.timeout_secs, Some(30));

        assert!(read_config(&dir.path().join("missing.json"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_read_required_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");

        let result = read_required_config(&missing).await;
        assert!(matches!(result, Err(ConfigError::NotFound(p)) if p == missing));

        std::fs::write(&missing, r#"{"folderId":"abc"}"#).unwrap();
        let layer = read_required_config(&missing).await.unwrap();
        assert_eq!(layer.folder_id.as_deref(), Some("abc"));
    }
}
