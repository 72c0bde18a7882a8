#![allow(dead_code)]

use async_trait::async_trait;
use crossword_sync::config::{ConfigLayer, SyncConfig};
use crossword_sync::remote::{RemoteError, RemoteFile, RemoteStore};
use crossword_sync::store::{DownloadError, Fetcher};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

pub const FOLDER_ID: &str = "folder-under-test";

/// Create a temporary directory for testing
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Config rooted in `root`, saving into `root/crosswords`
pub fn test_config(root: &Path) -> SyncConfig {
    SyncConfig::resolve(
        ConfigLayer {
            folder_id: Some(FOLDER_ID.to_string()),
            ..Default::default()
        },
        root,
        false,
    )
    .expect("Test config should resolve")
}

/// Write placeholder PDFs into `dir`, creating it if needed
pub fn seed_files(dir: &Path, names: &[&str]) {
    std::fs::create_dir_all(dir).expect("Should create save dir");
    for name in names {
        std::fs::write(dir.join(name), b"%PDF-1.4 seed").expect("Should write seed file");
    }
}

/// Sorted names of the files currently in `dir`
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Should read dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

/// Fetcher serving a fixed body, or failing with an HTTP status
pub struct FakeFetcher {
    body: Vec<u8>,
    fail_status: Option<u16>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn serving(body: &[u8]) -> Self {
        Self {
            body: body.to_vec(),
            fail_status: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            body: Vec::new(),
            fail_status: Some(status),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.fail_status {
            Some(status) => Err(DownloadError::Status {
                url: url.to_string(),
                status,
            }),
            None => Ok(self.body.clone()),
        }
    }
}

/// In-memory remote folder
pub struct FakeRemote {
    files: Mutex<Vec<RemoteFile>>,
    fail_list: bool,
    fail_upload: bool,
    list_calls: Mutex<u32>,
    uploads: Mutex<Vec<(String, PathBuf, String)>>,
}

impl FakeRemote {
    pub fn with_titles(titles: &[&str]) -> Self {
        let files = titles
            .iter()
            .enumerate()
            .map(|(i, title)| RemoteFile {
                title: title.to_string(),
                id: format!("id-{i}"),
                parent_id: Some(FOLDER_ID.to_string()),
            })
            .collect();
        Self {
            files: Mutex::new(files),
            fail_list: false,
            fail_upload: false,
            list_calls: Mutex::new(0),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_list() -> Self {
        Self {
            fail_list: true,
            ..Self::with_titles(&[])
        }
    }

    pub fn failing_upload(titles: &[&str]) -> Self {
        Self {
            fail_upload: true,
            ..Self::with_titles(titles)
        }
    }

    pub fn list_calls(&self) -> u32 {
        *self.list_calls.lock().unwrap()
    }

    /// (folder id, local path, title) of every upload
    pub fn uploads(&self) -> Vec<(String, PathBuf, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn list_files(&self, folder_id: &str) -> Result<Vec<RemoteFile>, RemoteError> {
        *self.list_calls.lock().unwrap() += 1;
        if self.fail_list {
            return Err(RemoteError::List {
                folder_id: folder_id.to_string(),
                message: "HTTP 503: backend unavailable".to_string(),
            });
        }
        Ok(self.files.lock().unwrap().clone())
    }

    async fn upload_file(
        &self,
        folder_id: &str,
        local_path: &Path,
        title: &str,
    ) -> Result<String, RemoteError> {
        if self.fail_upload {
            return Err(RemoteError::Upload {
                title: title.to_string(),
                message: "HTTP 403: insufficient permissions".to_string(),
            });
        }
        assert!(local_path.is_file(), "uploaded file should exist locally");

        let mut files = self.files.lock().unwrap();
        let id = format!("id-{}", files.len());
        files.push(RemoteFile {
            title: title.to_string(),
            id: id.clone(),
            parent_id: Some(folder_id.to_string()),
        });
        self.uploads.lock().unwrap().push((
            folder_id.to_string(),
            local_path.to_path_buf(),
            title.to_string(),
        ));
        Ok(id)
    }
}
