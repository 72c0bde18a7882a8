//! Google Drive v3 implementation of [`RemoteStore`].

use super::{RemoteError, RemoteFile, RemoteStore};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;
use tracing::debug;

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

const LIST_FIELDS: &str = "nextPageToken,files(id,name,parents)";
const PAGE_SIZE: &str = "1000";
const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListPage {
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    parents: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

/// Drive client bound to one access token
#[derive(Debug, Clone)]
pub struct DriveClient {
    client: reqwest::Client,
    access_token: String,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    pub fn new(client: reqwest::Client, access_token: impl Into<String>) -> Self {
        Self {
            client,
            access_token: access_token.into(),
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: DRIVE_UPLOAD_BASE.to_string(),
        }
    }

    /// Client against other API roots, e.g. a local mock server
    pub fn with_base_urls(
        client: reqwest::Client,
        access_token: impl Into<String>,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            access_token: access_token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            upload_base: upload_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn list_page(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<FileListPage, String> {
        let mut params = vec![
            ("q", query),
            ("fields", LIST_FIELDS),
            ("pageSize", PAGE_SIZE),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let response = self
            .client
            .get(format!("{}/files", self.api_base))
            .bearer_auth(&self.access_token)
            .query(&params)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(api_error_message(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| format!("Invalid file list response: {e}"))
    }
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn list_files(&self, folder_id: &str) -> Result<Vec<RemoteFile>, RemoteError> {
        let query = parent_query(folder_id);
        let list_err = |message| RemoteError::List {
            folder_id: folder_id.to_string(),
            message,
        };

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .list_page(&query, page_token.as_deref())
                .await
                .map_err(list_err)?;

            files.extend(page.files.into_iter().map(|f| RemoteFile {
                title: f.name,
                id: f.id,
                parent_id: f.parents.into_iter().next(),
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(folder_id, count = files.len(), "Listed remote folder");
        Ok(files)
    }

    async fn upload_file(
        &self,
        folder_id: &str,
        local_path: &Path,
        title: &str,
    ) -> Result<String, RemoteError> {
        let upload_err = |message| RemoteError::Upload {
            title: title.to_string(),
            message,
        };

        let content = fs::read(local_path).await?;
        let metadata = serde_json::json!({
            "name": title,
            "parents": [folder_id],
            "mimeType": PDF_MIME,
        });
        let boundary = format!("crossword-sync-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, &metadata.to_string(), PDF_MIME, &content);

        let response = self
            .client
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| upload_err(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| upload_err(e.to_string()))?;
        if !status.is_success() {
            return Err(upload_err(api_error_message(status.as_u16(), &text)));
        }

        let created: CreatedFile = serde_json::from_str(&text)
            .map_err(|e| upload_err(format!("Invalid upload response: {e}")))?;
        Ok(created.id)
    }
}

/// Drive search query for the live children of `folder_id`
fn parent_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}' in parents and trashed=false")
}

/// Body for a `multipart/related` upload: JSON metadata part then the media part
fn multipart_related_body(
    boundary: &str,
    metadata_json: &str,
    media_type: &str,
    media: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + metadata_json.len() + 256);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata_json}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {media_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// Pull `error.message` out of a Google API error body, falling back to the raw text
fn api_error_message(status: u16, body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    format!("HTTP {status}: {message}")
}
