//! Device Authorization Grant (RFC 8628) against Google's OAuth endpoints.
//!
//! Used the first time the tool runs, when no credentials are cached. The user
//! opens the verification URL on any device, enters the code, and the tool
//! polls the token endpoint until the grant completes.

use super::{oauth_error_message, AuthError, Credentials, OAuthClient, TokenResponse};
use super::{DRIVE_SCOPE, TOKEN_ENDPOINT};
use chrono::Utc;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const DEVICE_CODE_ENDPOINT: &str = "https://oauth2.googleapis.com/device/code";

const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Extra wait added on every `slow_down` response
const SLOW_DOWN_STEP_SECS: u64 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    5
}

#[derive(Debug)]
pub enum PollResult {
    Success(Credentials),
    Pending,
    SlowDown,
    Expired,
    AccessDenied,
}

pub async fn request_device_code(
    http: &reqwest::Client,
    oauth: &OAuthClient,
) -> Result<DeviceCodeResponse, AuthError> {
    let response = http
        .post(DEVICE_CODE_ENDPOINT)
        .form(&[("client_id", oauth.client_id.as_str()), ("scope", DRIVE_SCOPE)])
        .send()
        .await
        .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

    if !status.is_success() {
        return Err(AuthError::RequestFailed(oauth_error_message(
            status.as_u16(),
            &body,
        )));
    }

    Ok(serde_json::from_str(&body)?)
}

pub async fn poll_for_token(
    http: &reqwest::Client,
    oauth: &OAuthClient,
    device_code: &str,
) -> Result<PollResult, AuthError> {
    let response = http
        .post(TOKEN_ENDPOINT)
        .form(&[
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
            ("device_code", device_code),
            ("grant_type", DEVICE_GRANT_TYPE),
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
        return classify_poll_error(status.as_u16(), &body);
    }

    let token: TokenResponse = serde_json::from_str(&body)?;
    Ok(PollResult::Success(token.into_credentials(Utc::now(), None)))
}

/// Map an error body from the token endpoint to a poll outcome
fn classify_poll_error(status: u16, body: &str) -> Result<PollResult, AuthError> {
    let error: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    match error["error"].as_str().unwrap_or("") {
        "authorization_pending" => Ok(PollResult::Pending),
        "slow_down" => Ok(PollResult::SlowDown),
        "expired_token" => Ok(PollResult::Expired),
        "access_denied" => Ok(PollResult::AccessDenied),
        _ => Err(AuthError::RequestFailed(oauth_error_message(status, body))),
    }
}

/// Run the whole flow: request a code, show it, poll until granted
pub async fn run_device_code_flow(
    http: &reqwest::Client,
    oauth: &OAuthClient,
) -> Result<Credentials, AuthError> {
    let code = request_device_code(http, oauth).await?;

    eprintln!(
        "To authorize Drive access, visit {} and enter code {}",
        code.verification_url, code.user_code
    );

    let deadline = Instant::now() + Duration::from_secs(code.expires_in);
    let mut interval = Duration::from_secs(code.interval);

    loop {
        if Instant::now() >= deadline {
            return Err(AuthError::Expired);
        }

        tokio::time::sleep(interval).await;

        match poll_for_token(http, oauth, &code.device_code).await? {
            PollResult::Success(creds) => {
                info!("Device login completed");
                return Ok(creds);
            }
            PollResult::Pending => debug!("Authorization pending"),
            PollResult::SlowDown => {
                interval += Duration::from_secs(SLOW_DOWN_STEP_SECS);
                debug!(interval_secs = interval.as_secs(), "Slowing down poll rate");
            }
            PollResult::Expired => return Err(AuthError::Expired),
            PollResult::AccessDenied => return Err(AuthError::AccessDenied),
        }
    }
}
