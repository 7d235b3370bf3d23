// ABOUTME: Progress route handlers for photo uploads, photo listing and macro adherence
// ABOUTME: Photo category and date are stored as tags and decorated back onto listed rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use fitai_core::constants::progress::DEFAULT_ADHERENCE_RANGE_DAYS;
use fitai_core::errors::AppError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::{today, NewProgressPhoto, ProgressPhotoFilter, ProgressPhotoRecord};
use crate::resources::ServerResources;
use crate::routes::uploads::{dated_photo_path, PhotoForm};
use crate::services::identity::{ensure_user, normalize_user_id};
use crate::services::meals;

const CATEGORY_TAG: &str = "category:";
const DATE_TAG: &str = "date:";

const fn default_photo_limit() -> i64 {
    60
}

#[derive(Debug, Deserialize)]
struct PhotoListQuery {
    user_id: String,
    category: Option<String>,
    photo_type: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    #[serde(default = "default_photo_limit")]
    limit: i64,
}

const fn default_range_days() -> i64 {
    DEFAULT_ADHERENCE_RANGE_DAYS
}

#[derive(Debug, Deserialize)]
struct AdherenceQuery {
    user_id: String,
    #[serde(default = "default_range_days")]
    range_days: i64,
}

fn photo_tags(category: Option<&str>, date: &str) -> Vec<String> {
    let mut tags = Vec::with_capacity(2);
    if let Some(category) = category {
        tags.push(format!("{CATEGORY_TAG}{category}"));
    }
    tags.push(format!("{DATE_TAG}{date}"));
    tags
}

fn decorate(photo: &ProgressPhotoRecord) -> Value {
    let mut row = json!(photo);
    row["category"] = json!(photo.tag_value(CATEGORY_TAG));
    row["date"] = json!(photo.tag_value(DATE_TAG));
    row["type"] = json!(photo.photo_type);
    row
}

/// Progress routes
pub struct ProgressRoutes;

impl ProgressRoutes {
    /// Create all progress routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/progress/photos",
                get(Self::handle_list_photos).post(Self::handle_upload_photo),
            )
            .route("/progress/macro-adherence", get(Self::handle_macro_adherence))
            .with_state(resources)
    }

    async fn handle_upload_photo(
        State(resources): State<Arc<ServerResources>>,
        multipart: Multipart,
    ) -> Result<Response, AppError> {
        let form = PhotoForm::read(multipart).await?;
        let raw_user = form.required("user_id")?;
        let photo = form.require_photo()?;
        let photo_type = form.text("photo_type").unwrap_or("checkin").to_owned();
        let category = form.text("photo_category").map(str::to_owned);
        let date = form.text("checkin_date").map_or_else(today, str::to_owned);

        let user_id = ensure_user(&resources.database, raw_user).await?;
        let bucket = &resources.config.storage.progress_photo_bucket;
        let path = dated_photo_path(&user_id, &date);
        let photo_url = resources
            .blob_store
            .upload(bucket, &path, photo, form.content_type())
            .await?;

        resources
            .database
            .progress()
            .insert_photo(&NewProgressPhoto {
                user_id,
                url: photo_url.clone(),
                photo_type: photo_type.clone(),
                tags: photo_tags(category.as_deref(), &date),
            })
            .await?;

        Ok((
            StatusCode::OK,
            Json(json!({
                "status": "uploaded",
                "photo_url": photo_url,
                "photo_type": photo_type,
                "photo_category": category,
                "date": date,
            })),
        )
            .into_response())
    }

    async fn handle_list_photos(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<PhotoListQuery>,
    ) -> Result<Response, AppError> {
        let filter = ProgressPhotoFilter {
            category: query.category,
            photo_type: query.photo_type,
            start_date: query.start_date,
            end_date: query.end_date,
            limit: query.limit,
        };
        let photos: Vec<Value> = resources
            .database
            .progress()
            .list_photos(&normalize_user_id(&query.user_id), &filter)
            .await?
            .iter()
            .map(decorate)
            .collect();
        Ok((StatusCode::OK, Json(json!({ "photos": photos }))).into_response())
    }

    async fn handle_macro_adherence(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<AdherenceQuery>,
    ) -> Result<Response, AppError> {
        let adherence = meals::macro_adherence(
            &resources.database,
            &normalize_user_id(&query.user_id),
            query.range_days,
            Utc::now().date_naive(),
        )
        .await?;
        Ok((StatusCode::OK, Json(adherence)).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip_through_decoration() {
        let photo = ProgressPhotoRecord {
            id: "p1".to_owned(),
            user_id: "u1".to_owned(),
            url: "http://local/p.jpg".to_owned(),
            photo_type: "checkin".to_owned(),
            tags: photo_tags(Some("front"), "2025-02-03"),
            created_at: "2025-02-03T10:00:00Z".to_owned(),
        };
        let row = decorate(&photo);
        assert_eq!(row["category"], "front");
        assert_eq!(row["date"], "2025-02-03");
        assert_eq!(row["type"], "checkin");
    }

    #[test]
    fn test_tags_without_category() {
        assert_eq!(photo_tags(None, "2025-02-03"), vec!["date:2025-02-03"]);
    }
}
