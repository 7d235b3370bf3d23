// ABOUTME: AI route handlers for versioned prompt templates, ad-hoc prompt runs and job history
// ABOUTME: Every run is recorded as an ai_jobs row by the prompt runner
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! AI prompt routes
//!
//! Templates are stored by name with an increasing version; runs always use
//! the newest version. `POST /ai/prompt` exposes the same runner the
//! workout, check-in and meal flows use internally.

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
use crate::services::identity::normalize_user_id;
use crate::services::prompt_runner::run_prompt;

/// New prompt template version
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePromptRequest {
    pub name: String,
    pub template: String,
    pub version: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RunPromptQuery {
    name: String,
}

/// Prompt run body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunPromptRequest {
    pub user_id: Option<String>,
    #[serde(default)]
    pub inputs: Value,
}

const fn default_job_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
struct JobsQuery {
    user_id: String,
    #[serde(default = "default_job_limit")]
    limit: i64,
}

/// AI prompt and job routes
pub struct AiRoutes;

impl AiRoutes {
    /// Create all AI routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/ai/prompts", post(Self::handle_create_prompt))
            .route("/ai/prompt", post(Self::handle_run_prompt))
            .route("/ai/jobs", get(Self::handle_list_jobs))
            .with_state(resources)
    }

    async fn handle_create_prompt(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<CreatePromptRequest>,
    ) -> Result<Response, AppError> {
        if request.name.trim().is_empty() || request.template.trim().is_empty() {
            return Err(AppError::invalid_input("name and template are required"));
        }
        let prompt = resources
            .database
            .ai()
            .create_prompt(request.name.trim(), &request.template, request.version)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "prompt": prompt }))).into_response())
    }

    async fn handle_run_prompt(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<RunPromptQuery>,
        body: Option<Json<RunPromptRequest>>,
    ) -> Result<Response, AppError> {
        let request = body.map(|Json(r)| r).unwrap_or_default();
        let user_id = request.user_id.as_deref().map(normalize_user_id);
        let result = run_prompt(
            &resources.database,
            resources.llm.as_ref(),
            &query.name,
            user_id.as_deref(),
            &request.inputs,
        )
        .await?;
        Ok((StatusCode::OK, Json(json!({ "result": result }))).into_response())
    }

    async fn handle_list_jobs(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<JobsQuery>,
    ) -> Result<Response, AppError> {
        let jobs = resources
            .database
            .ai()
            .list_jobs(&normalize_user_id(&query.user_id), query.limit)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "jobs": jobs }))).into_response())
    }
}
