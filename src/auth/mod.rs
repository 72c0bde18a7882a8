//! Google OAuth credentials for the Drive client.
//!
//! Credentials are cached in a JSON file. A run loads the cache, refreshes the
//! access token when it is close to expiry, and falls back to the device code
//! flow when nothing is cached. Whatever comes out is written back so the next
//! scheduled run starts from a valid token.

pub mod device_code;
pub mod token_storage;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::info;

/// Scope needed to list and create files the tool itself uploaded
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed before use
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("OAuth request failed: {0}")]
    RequestFailed(String),

    #[error("No OAuth client configured. Provide a client_secrets.json or client id/secret.")]
    MissingClient,

    #[error("Invalid client secrets file: {0}")]
    InvalidClientSecrets(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Cached credentials have no refresh token; delete the cache and log in again")]
    NoRefreshToken,

    #[error("Device code expired before the login was completed")]
    Expired,

    #[error("Access denied by the user")]
    AccessDenied,
}

/// OAuth client registration (from the Google Cloud console)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<OAuthClient>,
    web: Option<OAuthClient>,
}

/// Cached OAuth token set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Credentials {
    /// Whether the access token is expired or about to expire at `now`
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }
}

/// Successful body of the token endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    /// Google omits the refresh token on refresh responses; keep the old one then
    pub(crate) fn into_credentials(
        self,
        now: DateTime<Utc>,
        previous_refresh_token: Option<String>,
    ) -> Credentials {
        Credentials {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh_token),
            expires_at: now + Duration::seconds(self.expires_in.unwrap_or(3600)),
            scope: self.scope,
            token_type: self.token_type.unwrap_or_else(default_token_type),
        }
    }
}

/// Read a Google `client_secrets.json` (either the `installed` or `web` form)
pub async fn read_client_secrets(path: &Path) -> Result<OAuthClient, AuthError> {
    let content = fs::read_to_string(path).await?;
    parse_client_secrets(&content)
}

fn parse_client_secrets(content: &str) -> Result<OAuthClient, AuthError> {
    let file: ClientSecretsFile = serde_json::from_str(content)
        .map_err(|e| AuthError::InvalidClientSecrets(e.to_string()))?;
    file.installed
        .or(file.web)
        .ok_or_else(|| AuthError::InvalidClientSecrets("expected an 'installed' or 'web' section".to_string()))
}

/// Pick the OAuth client: explicit id/secret first, then the secrets file if present
pub async fn resolve_oauth_client(
    client_id: Option<&str>,
    client_secret: Option<&str>,
    client_secrets_path: &Path,
) -> Result<Option<OAuthClient>, AuthError> {
    if let (Some(id), Some(secret)) = (client_id, client_secret) {
        return Ok(Some(OAuthClient {
            client_id: id.to_string(),
            client_secret: secret.to_string(),
        }));
    }

    if !client_secrets_path.exists() {
        return Ok(None);
    }

    read_client_secrets(client_secrets_path).await.map(Some)
}

/// Load, refresh or obtain credentials, then save them back to `credentials_path`
pub async fn authenticate(
    http: &reqwest::Client,
    oauth: Option<&OAuthClient>,
    credentials_path: &Path,
) -> Result<Credentials, AuthError> {
    let cached = token_storage::load_credentials(credentials_path).await?;

    let credentials = match cached {
        None => {
            info!("No cached credentials, starting device login");
            let oauth = oauth.ok_or(AuthError::MissingClient)?;
            device_code::run_device_code_flow(http, oauth).await?
        }
        Some(creds) if creds.needs_refresh(Utc::now()) => {
            info!("Access token expired, refreshing");
            let oauth = oauth.ok_or(AuthError::MissingClient)?;
            refresh(http, oauth, &creds).await?
        }
        Some(creds) => creds,
    };

    token_storage::save_credentials(credentials_path, &credentials).await?;
    Ok(credentials)
}

/// Exchange the refresh token for a new access token
pub async fn refresh(
    http: &reqwest::Client,
    oauth: &OAuthClient,
    credentials: &Credentials,
) -> Result<Credentials, AuthError> {
    refresh_with_endpoint(http, TOKEN_ENDPOINT, oauth, credentials).await
}

/// [`refresh`] against an explicit token endpoint
pub async fn refresh_with_endpoint(
    http: &reqwest::Client,
    token_endpoint: &str,
    oauth: &OAuthClient,
    credentials: &Credentials,
) -> Result<Credentials, AuthError> {
    let refresh_token = credentials
        .refresh_token
        .as_deref()
        .ok_or(AuthError::NoRefreshToken)?;

    let response = http
        .post(token_endpoint)
        .form(&[
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await
        .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

    if !status.is_success() {
        return Err(AuthError::RefreshFailed(oauth_error_message(status.as_u16(), &body)));
    }

    let token: TokenResponse = serde_json::from_str(&body)?;
    Ok(token.into_credentials(Utc::now(), credentials.refresh_token.clone()))
}

/// Render an OAuth error body (`error` / `error_description`) for logs
pub(crate) fn oauth_error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(v) => {
            let code = v["error"].as_str().unwrap_or("unknown_error");
            match v["error_description"].as_str() {
                Some(desc) => format!("HTTP {status}: {code} ({desc})"),
                None => format!("HTTP {status}: {code}"),
            }
        }
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn creds_expiring_at(expires_at: DateTime<Utc>) -> Credentials {
        Credentials {
            access_token: "ya29.token".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expires_at,
            scope: Some(DRIVE_SCOPE.to_string()),
            token_type: "Bearer".to_string(),
        }
    }

    #[test]
    fn test_needs_refresh_margin() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 6, 0, 0).unwrap();
        assert!(creds_expiring_at(now).needs_refresh(now));
        assert!(creds_expiring_at(now + Duration::seconds(30)).needs_refresh(now));
        assert!(!creds_expiring_at(now + Duration::minutes(10)).needs_refresh(now));
    }

    #[test]
    fn test_refresh_response_keeps_previous_refresh_token() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 6, 0, 0).unwrap();
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token":"new","expires_in":3599,"token_type":"Bearer"}"#)
                .unwrap();
        let creds = token.into_credentials(now, Some("old-refresh".to_string()));
        assert_eq!(creds.access_token, "new");
        assert_eq!(creds.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(creds.expires_at, now + Duration::seconds(3599));
    }

    #[test]
    fn test_parse_client_secrets_installed() {
        let client = parse_client_secrets(
            r#"{"installed":{"client_id":"abc.apps.googleusercontent.com","client_secret":"s3cret","redirect_uris":["http://localhost"]}}"#,
        )
        .unwrap();
        assert_eq!(client.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(client.client_secret, "s3cret");
    }

    #[test]
    fn test_parse_client_secrets_rejects_unknown_shape() {
        assert!(matches!(
            parse_client_secrets(r#"{"other":{}}"#),
            Err(AuthError::InvalidClientSecrets(_))
        ));
    }

    #[test]
    fn test_oauth_error_message() {
        assert_eq!(
            oauth_error_message(400, r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#),
            "HTTP 400: invalid_grant (Token has been expired or revoked.)"
        );
        assert_eq!(oauth_error_message(500, "oops"), "HTTP 500: oops");
    }

    #[tokio::test]
    async fn test_resolve_oauth_client_prefers_explicit_values() {
        let dir = tempfile::tempdir().unwrap();
        let secrets = dir.path().join("client_secrets.json");

        assert!(resolve_oauth_client(None, None, &secrets).await.unwrap().is_none());

        std::fs::write(
            &secrets,
            r#"{"installed":{"client_id":"file-id","client_secret":"file-secret"}}"#,
        )
        .unwrap();
        let from_file = resolve_oauth_client(Some("only-id"), None, &secrets)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(from_file.client_id, "file-id");

        let explicit = resolve_oauth_client(Some("env-id"), Some("env-secret"), &secrets)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(explicit.client_id, "env-id");
    }
}
