// ABOUTME: Progress photo rows with tag-encoded category and date
// ABOUTME: Filtering by category uses json_each over the stored tag array
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::Result;
use fitai_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::{now_timestamp, Database};

impl Database {
    /// Create the progress photo table
    ///
    /// # Errors
    ///
    /// Returns an error if table creation fails
    pub(super) async fn migrate_progress(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS progress_photos (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                url TEXT NOT NULL,
                photo_type TEXT NOT NULL DEFAULT 'checkin',
                tags TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_progress_photos_user ON progress_photos(user_id, created_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Stored progress photo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressPhotoRecord {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub photo_type: String,
    /// `category:<c>` and `date:<d>` markers
    pub tags: Vec<String>,
    pub created_at: String,
}

impl ProgressPhotoRecord {
    fn from_row(r: &SqliteRow) -> Self {
        let tags = r
            .get::<Option<String>, _>("tags")
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            url: r.get("url"),
            photo_type: r.get("photo_type"),
            tags,
            created_at: r.get("created_at"),
        }
    }

    /// Value of the first tag starting with `prefix`
    #[must_use]
    pub fn tag_value(&self, prefix: &str) -> Option<&str> {
        self.tags.iter().find_map(|t| t.strip_prefix(prefix))
    }
}

/// Photo row to insert
#[derive(Debug, Clone)]
pub struct NewProgressPhoto {
    pub user_id: String,
    pub url: String,
    pub photo_type: String,
    pub tags: Vec<String>,
}

/// Listing filter; every field is optional except the limit
#[derive(Debug, Clone, Default)]
pub struct ProgressPhotoFilter {
    pub category: Option<String>,
    pub photo_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: i64,
}

/// Progress photo operations
pub struct ProgressManager {
    pool: SqlitePool,
}

impl ProgressManager {
    /// Create a new progress manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a photo row
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn insert_photo(&self, photo: &NewProgressPhoto) -> AppResult<ProgressPhotoRecord> {
        let record = ProgressPhotoRecord {
            id: Uuid::new_v4().to_string(),
            user_id: photo.user_id.clone(),
            url: photo.url.clone(),
            photo_type: photo.photo_type.clone(),
            tags: photo.tags.clone(),
            created_at: now_timestamp(),
        };
        let tags = if record.tags.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&record.tags)?)
        };

        sqlx::query(
            r"
            INSERT INTO progress_photos (id, user_id, url, photo_type, tags, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.url)
        .bind(&record.photo_type)
        .bind(tags)
        .bind(&record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save progress photo: {e}")))?;

        Ok(record)
    }

    /// Photos for a user, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_photos(
        &self,
        user_id: &str,
        filter: &ProgressPhotoFilter,
    ) -> AppResult<Vec<ProgressPhotoRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, url, photo_type, tags, created_at
            FROM progress_photos p
            WHERE user_id = $1
              AND ($2 IS NULL OR EXISTS (
                    SELECT 1 FROM json_each(COALESCE(p.tags, '[]')) WHERE json_each.value = $2))
              AND ($3 IS NULL OR photo_type = $3)
              AND ($4 IS NULL OR substr(created_at, 1, 10) >= $4)
              AND ($5 IS NULL OR substr(created_at, 1, 10) <= $5)
            ORDER BY created_at DESC
            LIMIT $6
            ",
        )
        .bind(user_id)
        .bind(filter.category.as_ref().map(|c| format!("category:{c}")))
        .bind(&filter.photo_type)
        .bind(&filter.start_date)
        .bind(&filter.end_date)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list progress photos: {e}")))?;

        Ok(rows.iter().map(ProgressPhotoRecord::from_row).collect())
    }

    /// Delete photo rows whose URL is in `urls`; returns the number removed
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails
    pub async fn delete_by_urls(&self, user_id: &str, urls: &[String]) -> AppResult<u64> {
        let mut removed = 0;
        for url in urls {
            let result = sqlx::query("DELETE FROM progress_photos WHERE user_id = $1 AND url = $2")
                .bind(user_id)
                .bind(url)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to delete progress photos: {e}")))?;
            removed += result.rows_affected();
        }
        Ok(removed)
    }
}
