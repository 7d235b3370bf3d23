// ABOUTME: Multipart form collection shared by the photo upload routes
// ABOUTME: Gathers text fields and the photo part, and builds dated object paths
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;
use fitai_core::errors::{AppError, AppResult};
use uuid::Uuid;

/// Field carrying the image bytes
const PHOTO_FIELD: &str = "photo";
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Parsed photo upload form
#[derive(Debug, Default)]
pub struct PhotoForm {
    fields: HashMap<String, String>,
    pub photo: Bytes,
    pub content_type: Option<String>,
}

impl PhotoForm {
    /// Drain a multipart body
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the body is not valid multipart
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::invalid_input(format!("Invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            if name == PHOTO_FIELD {
                form.content_type = field.content_type().map(str::to_owned);
                form.photo = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::invalid_input(format!("Failed to read photo: {e}")))?;
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::invalid_input(format!("Failed to read {name}: {e}")))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// Non-empty text field
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Required text field
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the field is missing or blank
    pub fn required(&self, name: &str) -> AppResult<&str> {
        self.text(name)
            .ok_or_else(|| AppError::invalid_input(format!("{name} is required")))
    }

    /// Photo bytes, rejecting an empty upload
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` with `Photo is required.`
    pub fn require_photo(&self) -> AppResult<Bytes> {
        if self.photo.is_empty() {
            return Err(AppError::invalid_input("Photo is required."));
        }
        Ok(self.photo.clone())
    }

    /// Upload content type, defaulting to JPEG
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

/// `<user>/<date>/<random>.jpg`
#[must_use]
pub fn dated_photo_path(user_id: &str, date: &str) -> String {
    format!("{user_id}/{date}/{}.jpg", Uuid::new_v4().simple())
}
