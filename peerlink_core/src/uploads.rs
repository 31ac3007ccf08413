//! Upload id -> persisted file lookup for the HTTP download path.

use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::multipart::MultipartResult;
use crate::utils::sanitize_file_name;

pub struct UploadStore {
    upload_dir: PathBuf,
    files: RwLock<HashMap<String, PathBuf>>,
}

impl UploadStore {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Write the uploaded bytes to `<upload_dir>/<uuid>_<name>` and return a
    /// fresh id for it
    pub async fn persist(&self, upload: &MultipartResult) -> std::io::Result<String> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;

        let stored_name = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(&upload.filename));
        let path = self.upload_dir.join(stored_name);
        tokio::fs::write(&path, &upload.file_content).await?;

        let id = Uuid::new_v4().to_string();
        info!(
            "Stored upload '{}' ({} bytes, {}) as {}",
            upload.filename,
            upload.file_content.len(),
            upload.content_type,
            id
        );
        self.files.write().await.insert(id.clone(), path);
        Ok(id)
    }

    pub async fn path(&self, id: &str) -> Option<PathBuf> {
        self.files.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}
