// ABOUTME: Coach marketplace route handlers for coach profiles and discovery
// ABOUTME: Profiles are keyed by the owning user's id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fitai_core::errors::AppError;
use serde::Deserialize;
use serde_json::json;

use crate::database::CoachProfileUpsert;
use crate::resources::ServerResources;
use crate::services::identity::normalize_user_id;

const fn default_discover_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
struct DiscoverQuery {
    #[serde(default = "default_discover_limit")]
    limit: i64,
}

/// Coach profile routes
pub struct CoachRoutes;

impl CoachRoutes {
    /// Create all coach routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/coach/profile", post(Self::handle_upsert_profile))
            .route("/coach/profile/:user_id", get(Self::handle_get_profile))
            .route("/coach/discover", get(Self::handle_discover))
            .with_state(resources)
    }

    async fn handle_upsert_profile(
        State(resources): State<Arc<ServerResources>>,
        Json(mut request): Json<CoachProfileUpsert>,
    ) -> Result<Response, AppError> {
        request.user_id = normalize_user_id(&request.user_id);
        let profile = resources.database.coach().upsert(&request).await?;
        Ok((StatusCode::OK, Json(json!({ "profile": profile }))).into_response())
    }

    async fn handle_get_profile(
        State(resources): State<Arc<ServerResources>>,
        Path(user_id): Path<String>,
    ) -> Result<Response, AppError> {
        let profile = resources
            .database
            .coach()
            .get(&normalize_user_id(&user_id))
            .await?
            .ok_or_else(|| AppError::not_found("Coach profile"))?;
        Ok((StatusCode::OK, Json(json!({ "profile": profile }))).into_response())
    }

    async fn handle_discover(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<DiscoverQuery>,
    ) -> Result<Response, AppError> {
        let results = resources.database.coach().discover(query.limit).await?;
        Ok((StatusCode::OK, Json(json!({ "results": results }))).into_response())
    }
}
