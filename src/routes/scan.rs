// ABOUTME: Meal photo scan route: upload, AI parse and nutrition log in one request
// ABOUTME: Photos land in the meal bucket under <user>/<date>/<random>.jpg
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use fitai_core::errors::AppError;
use serde_json::json;
use tracing::info;

use crate::database::today;
use crate::resources::ServerResources;
use crate::routes::uploads::{dated_photo_path, PhotoForm};
use crate::services::identity::ensure_user;
use crate::services::meals;

/// Meal scan routes
pub struct ScanRoutes;

impl ScanRoutes {
    /// Create all scan routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/scan/meal-photo", post(Self::handle_meal_photo))
            .with_state(resources)
    }

    async fn handle_meal_photo(
        State(resources): State<Arc<ServerResources>>,
        multipart: Multipart,
    ) -> Result<Response, AppError> {
        let form = PhotoForm::read(multipart).await?;
        let raw_user = form.required("user_id")?;
        let meal_type = form.required("meal_type")?.to_owned();
        let photo = form.require_photo()?;

        let user_id = ensure_user(&resources.database, raw_user).await?;
        let date = today();
        let bucket = &resources.config.storage.meal_photo_bucket;
        let path = dated_photo_path(&user_id, &date);
        let photo_url = resources
            .blob_store
            .upload(bucket, &path, photo, form.content_type())
            .await?;

        let parsed = meals::log_photo_meal(
            &resources.database,
            resources.llm.as_ref(),
            &user_id,
            &meal_type,
            Some(&photo_url),
            date,
        )
        .await?;

        info!(user_id = %user_id, log_id = %parsed.log.id, "Meal photo logged");
        Ok((
            StatusCode::OK,
            Json(json!({
                "status": "logged",
                "ai_result": parsed.ai_result,
                "photo_url": photo_url,
            })),
        )
            .into_response())
    }
}
