// ABOUTME: Exercise catalogue route handlers
// ABOUTME: Create catalogue entries and case-insensitive name search
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fitai_core::errors::AppError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::resources::ServerResources;

const DEFAULT_SEARCH_LIMIT: i64 = 20;

/// New catalogue entry
#[derive(Debug, Clone, Deserialize)]
pub struct CreateExerciseRequest {
    pub name: String,
    #[serde(default)]
    pub muscle_groups: Value,
    #[serde(default)]
    pub equipment: Value,
    #[serde(default)]
    pub metadata: Value,
}

const fn default_limit() -> i64 {
    DEFAULT_SEARCH_LIMIT
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    query: String,
    #[serde(default = "default_limit")]
    limit: i64,
}

/// Exercise catalogue routes
pub struct ExerciseRoutes;

impl ExerciseRoutes {
    /// Create all exercise routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/exercises", post(Self::handle_create))
            .route("/exercises/search", get(Self::handle_search))
            .with_state(resources)
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<CreateExerciseRequest>,
    ) -> Result<Response, AppError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::invalid_input("name is required"));
        }
        let exercise = resources
            .database
            .exercises()
            .create(
                name,
                &request.muscle_groups,
                &request.equipment,
                &request.metadata,
            )
            .await?;
        Ok((StatusCode::OK, Json(json!({ "exercise": exercise }))).into_response())
    }

    async fn handle_search(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<SearchQuery>,
    ) -> Result<Response, AppError> {
        let results = resources
            .database
            .exercises()
            .search(query.query.trim(), query.limit)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "results": results }))).into_response())
    }
}
