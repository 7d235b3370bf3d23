// ABOUTME: Filesystem blob store writing objects under a root directory
// ABOUTME: Files are served back by the HTTP server under the configured public prefix
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use fitai_core::errors::{AppError, AppResult};
use tracing::{debug, warn};

use super::{validate_object_path, BlobStore};

/// Stores objects at `<root>/<bucket>/<path>`
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    /// Create a store rooted at `root`
    #[must_use]
    pub fn new(root: PathBuf, public_base_url: String) -> Self {
        Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn object_path(&self, bucket: &str, path: &str) -> AppResult<PathBuf> {
        validate_object_path(bucket)?;
        validate_object_path(path)?;
        Ok(self.root.join(bucket).join(path))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn name(&self) -> &'static str {
        "local"
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{bucket}/{path}", self.public_base_url)
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        _content_type: &str,
    ) -> AppResult<String> {
        let target = self.object_path(bucket, path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::storage(format!("Failed to create directory: {e}")))?;
        }
        tokio::fs::write(&target, &data)
            .await
            .map_err(|e| AppError::storage(format!("Failed to write {path}: {e}")))?;

        debug!(bucket, path, bytes = data.len(), "Stored blob");
        Ok(self.public_url(bucket, path))
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> AppResult<()> {
        validate_object_path(bucket)?;
        let mut failed = 0_usize;
        for path in paths {
            let target = match self.object_path(bucket, path) {
                Ok(target) => target,
                Err(e) => {
                    warn!(bucket, path = %path, error = %e.message, "Skipping invalid blob path");
                    continue;
                }
            };
            match tokio::fs::remove_file(&target).await {
                Ok(()) => {}
                // Already gone
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(bucket, path = %path, error = %e, "Failed to delete blob");
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            return Err(AppError::storage(format!(
                "Failed to delete {failed} of {} objects",
                paths.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_then_remove() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf(), "/uploads/".to_owned());

        let url = store
            .upload("meal-photos", "u1/2025-03-01/a.jpg", Bytes::from_static(b"jpg"), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(url, "/uploads/meal-photos/u1/2025-03-01/a.jpg");

        let on_disk = dir.path().join("meal-photos/u1/2025-03-01/a.jpg");
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), b"jpg");

        store
            .remove("meal-photos", &["u1/2025-03-01/a.jpg".to_owned(), "missing.jpg".to_owned()])
            .await
            .unwrap();
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn test_remove_skips_invalid_paths_and_deletes_the_rest() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf(), "/uploads".to_owned());
        for path in ["u1/a.jpg", "u1/b.jpg"] {
            store
                .upload("progress-photos", path, Bytes::from_static(b"jpg"), "image/jpeg")
                .await
                .unwrap();
        }
        let outside = dir.path().join("keep.jpg");
        tokio::fs::write(&outside, b"keep").await.unwrap();

        store
            .remove(
                "progress-photos",
                &[
                    "../keep.jpg".to_owned(),
                    "u1/a.jpg".to_owned(),
                    "/etc/passwd".to_owned(),
                    String::new(),
                    "u1/b.jpg".to_owned(),
                ],
            )
            .await
            .unwrap();

        assert!(!dir.path().join("progress-photos/u1/a.jpg").exists());
        assert!(!dir.path().join("progress-photos/u1/b.jpg").exists());
        assert!(outside.exists());
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf(), "/uploads".to_owned());
        let err = store
            .upload("meal-photos", "../../x.jpg", Bytes::new(), "image/jpeg")
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }
}
