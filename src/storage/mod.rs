// ABOUTME: Blob storage abstraction for meal and progress photos
// ABOUTME: Pluggable backends (local filesystem, Supabase Storage) selected from configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Blob Storage
//!
//! Photos are written under `<bucket>/<path>` and addressed by a public URL.
//! Deleting is best effort everywhere it is used, so backends report errors
//! and callers decide whether to log or propagate.

/// Local filesystem backend
pub mod local;
/// Supabase Storage backend
pub mod supabase;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use fitai_core::errors::{AppError, AppResult};
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};

pub use local::LocalBlobStore;
pub use supabase::SupabaseBlobStore;

/// Blob store used for uploaded photos
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Public URL of an object
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Store an object and return its public URL
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> AppResult<String>;

    /// Delete objects by path
    ///
    /// Paths that fail [`validate_object_path`] are logged and skipped so the
    /// rest of the batch is still deleted.
    ///
    /// # Errors
    ///
    /// Returns a storage error if any delete fails
    async fn remove(&self, bucket: &str, paths: &[String]) -> AppResult<()>;

    /// Recover the object path from a public URL issued for `bucket`
    fn path_from_url(&self, bucket: &str, url: &str) -> Option<String> {
        let prefix = self.public_url(bucket, "");
        url.strip_prefix(&prefix)
            .map(|rest| rest.split(['?', '#']).next().unwrap_or(rest).to_owned())
            .filter(|path| !path.is_empty())
    }
}

/// Reject paths that could escape the bucket
///
/// # Errors
///
/// Returns `InvalidInput` for empty, absolute or `..` paths
pub fn validate_object_path(path: &str) -> AppResult<()> {
    if path.is_empty() || path.starts_with('/') || path.split('/').any(|p| p == "..") {
        return Err(AppError::invalid_input(format!(
            "Invalid storage path: {path}"
        )));
    }
    Ok(())
}

/// Build the configured blob store
///
/// # Errors
///
/// Returns a configuration error when the Supabase backend lacks credentials
pub fn from_config(config: &StorageConfig) -> AppResult<Arc<dyn BlobStore>> {
    match config.backend {
        StorageBackend::Local => {
            info!(dir = %config.local_dir.display(), "Using local blob storage");
            Ok(Arc::new(LocalBlobStore::new(
                config.local_dir.clone(),
                config.public_base_url.clone(),
            )))
        }
        StorageBackend::Supabase => {
            let (Some(url), Some(key)) = (&config.supabase_url, &config.supabase_key) else {
                return Err(AppError::config(
                    "Supabase storage requires SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY",
                ));
            };
            info!(url = %url, "Using Supabase blob storage");
            Ok(Arc::new(SupabaseBlobStore::new(url, key)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path_validation() {
        assert!(validate_object_path("user/2025-01-01/a.jpg").is_ok());
        assert!(validate_object_path("../etc/passwd").is_err());
        assert!(validate_object_path("/abs.jpg").is_err());
        assert!(validate_object_path("").is_err());
    }

    #[test]
    fn test_path_from_url_round_trip() {
        let store = LocalBlobStore::new("/tmp/x".into(), "http://localhost:8000/uploads".into());
        let url = store.public_url("progress-photos", "u1/2025-01-01/p.jpg");
        assert_eq!(
            store.path_from_url("progress-photos", &url).as_deref(),
            Some("u1/2025-01-01/p.jpg")
        );
        assert!(store.path_from_url("meal-photos", &url).is_none());
    }
}
