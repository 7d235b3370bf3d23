// ABOUTME: Supabase Storage blob store over the REST object API
// ABOUTME: Uploads with the service-role key and returns public bucket URLs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use fitai_core::errors::{AppError, AppResult};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, warn};

use super::{validate_object_path, BlobStore};

const SERVICE: &str = "Supabase Storage";

/// Supabase Storage client
pub struct SupabaseBlobStore {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseBlobStore {
    /// Create a client for the project at `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(base_url: &str, service_key: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            service_key: service_key.to_owned(),
        })
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{bucket}/{path}", self.base_url)
    }

    async fn check(response: reqwest::Response, action: &str) -> AppResult<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        error!(%status, action, "Supabase storage request failed");
        Err(AppError::storage(format!(
            "{SERVICE} {action} failed ({status}): {body}"
        )))
    }
}

#[async_trait]
impl BlobStore for SupabaseBlobStore {
    fn name(&self) -> &'static str {
        "supabase"
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base_url)
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> AppResult<String> {
        validate_object_path(path)?;
        let response = self
            .client
            .post(self.object_url(bucket, path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(data)
            .send()
            .await
            .map_err(|e| AppError::storage(format!("{SERVICE} upload failed: {e}")))?;
        Self::check(response, "upload").await?;

        debug!(bucket, path, "Uploaded blob");
        Ok(self.public_url(bucket, path))
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> AppResult<()> {
        let paths: Vec<&String> = paths
            .iter()
            .filter(|path| match validate_object_path(path) {
                Ok(()) => true,
                Err(e) => {
                    warn!(bucket, path = %path, error = %e.message, "Skipping invalid blob path");
                    false
                }
            })
            .collect();
        if paths.is_empty() {
            return Ok(());
        }
        let response = self
            .client
            .delete(format!("{}/storage/v1/object/{bucket}", self.base_url))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&json!({ "prefixes": paths }))
            .send()
            .await
            .map_err(|e| AppError::storage(format!("{SERVICE} delete failed: {e}")))?;
        Self::check(response, "delete").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/storage/v1/object/meal-photos/u1/2025-01-01/a.jpg")
            .match_header("authorization", "Bearer service-key")
            .match_header("content-type", "image/jpeg")
            .with_status(200)
            .with_body(r#"{"Key":"meal-photos/u1/2025-01-01/a.jpg"}"#)
            .create_async()
            .await;

        let store = SupabaseBlobStore::new(&server.url(), "service-key").unwrap();
        let url = store
            .upload("meal-photos", "u1/2025-01-01/a.jpg", Bytes::from_static(b"x"), "image/jpeg")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            url,
            format!("{}/storage/v1/object/public/meal-photos/u1/2025-01-01/a.jpg", server.url())
        );
        assert_eq!(
            store.path_from_url("meal-photos", &url).as_deref(),
            Some("u1/2025-01-01/a.jpg")
        );
    }

    #[tokio::test]
    async fn test_remove_sends_prefixes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/storage/v1/object/progress-photos")
            .match_body(Matcher::Json(json!({ "prefixes": ["u1/a.jpg"] })))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let store = SupabaseBlobStore::new(&server.url(), "service-key").unwrap();
        store
            .remove(
                "progress-photos",
                &["../u2/b.jpg".to_owned(), "u1/a.jpg".to_owned()],
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_remove_with_only_invalid_paths_sends_nothing() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let store = SupabaseBlobStore::new(&server.url(), "service-key").unwrap();
        store
            .remove("progress-photos", &["/abs.jpg".to_owned(), "a/../b.jpg".to_owned()])
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_upload_is_storage_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let store = SupabaseBlobStore::new(&server.url(), "bad").unwrap();
        let err = store
            .upload("meal-photos", "a.jpg", Bytes::new(), "image/jpeg")
            .await
            .unwrap_err();
        assert_eq!(err.code, fitai_core::errors::ErrorCode::StorageError);
    }
}
