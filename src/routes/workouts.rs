// ABOUTME: Workout route handlers for templates, sessions, exercise logs and history
// ABOUTME: Delegates PR detection and template assembly to the training service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Workout routes
//!
//! Every user id is normalized before use, and writes make sure a user row
//! exists for it.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fitai_core::constants::prompts::WORKOUT_GENERATION;
use fitai_core::constants::workouts::SESSION_LIST_LIMIT;
use fitai_core::errors::AppError;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::database::NewExerciseLog;
use crate::resources::ServerResources;
use crate::services::identity::{ensure_user, normalize_user_id};
use crate::services::prompt_runner::{parse_json_output, run_prompt};
use crate::services::training::{self, TemplateExerciseInput};

const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// Request for an AI-generated workout
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateWorkoutRequest {
    pub user_id: Option<String>,
    #[serde(default)]
    pub muscle_groups: Vec<String>,
    pub workout_type: Option<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    pub duration_minutes: Option<i64>,
}

fn default_mode() -> String {
    "manual".to_owned()
}

/// Template create request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateRequest {
    pub user_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub exercises: Vec<TemplateExerciseInput>,
}

/// Template update request
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTemplateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub mode: Option<String>,
    pub exercises: Option<Vec<TemplateExerciseInput>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DuplicateTemplateRequest {
    user_id: Option<String>,
    title: Option<String>,
}

fn default_session_status() -> String {
    "in_progress".to_owned()
}

#[derive(Debug, Clone, Deserialize)]
struct StartSessionRequest {
    user_id: String,
    template_id: Option<String>,
    #[serde(default = "default_session_status")]
    status: String,
}

const fn default_sets() -> i64 {
    1
}

/// Exercise log request; defaults match a single working set
#[derive(Debug, Clone, Deserialize)]
pub struct LogExerciseRequest {
    pub exercise_name: String,
    #[serde(default = "default_sets")]
    pub sets: i64,
    #[serde(default)]
    pub reps: i64,
    #[serde(default)]
    pub weight: f64,
    pub duration_minutes: Option<i64>,
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub is_warmup: bool,
    pub set_index: Option<i64>,
    pub notes: Option<String>,
}

impl From<LogExerciseRequest> for NewExerciseLog {
    fn from(request: LogExerciseRequest) -> Self {
        Self {
            exercise_name: request.exercise_name,
            sets: request.sets,
            reps: request.reps,
            weight: request.weight,
            duration_minutes: request.duration_minutes,
            duration_seconds: request.duration_seconds,
            is_warmup: request.is_warmup,
            set_index: request.set_index,
            notes: request.notes,
        }
    }
}

fn default_completed_status() -> String {
    "completed".to_owned()
}

#[derive(Debug, Clone, Deserialize)]
struct CompleteSessionRequest {
    duration_seconds: Option<i64>,
    #[serde(default = "default_completed_status")]
    status: String,
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user_id: String,
}

const fn default_history_limit() -> i64 {
    DEFAULT_HISTORY_LIMIT
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    user_id: String,
    exercise_name: String,
    #[serde(default = "default_history_limit")]
    limit: i64,
}

/// Workout routes
pub struct WorkoutRoutes;

impl WorkoutRoutes {
    /// Create all workout routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/workouts/generate", post(Self::handle_generate))
            .route(
                "/workouts/templates",
                get(Self::handle_list_templates).post(Self::handle_create_template),
            )
            .route(
                "/workouts/templates/:id",
                get(Self::handle_get_template)
                    .put(Self::handle_update_template)
                    .delete(Self::handle_delete_template),
            )
            .route(
                "/workouts/templates/:id/duplicate",
                post(Self::handle_duplicate_template),
            )
            .route("/workouts/sessions", get(Self::handle_list_sessions))
            .route("/workouts/sessions/start", post(Self::handle_start_session))
            .route("/workouts/sessions/:id/log", post(Self::handle_log_exercise))
            .route(
                "/workouts/sessions/:id/complete",
                post(Self::handle_complete_session),
            )
            .route("/workouts/sessions/:id/logs", get(Self::handle_session_logs))
            .route(
                "/workouts/exercises/history",
                get(Self::handle_exercise_history),
            )
            .with_state(resources)
    }

    async fn handle_generate(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<GenerateWorkoutRequest>,
    ) -> Result<Response, AppError> {
        let user_id = match request.user_id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(raw) => Some(ensure_user(&resources.database, raw).await?),
            None => None,
        };
        let inputs = json!({
            "muscle_groups": request.muscle_groups,
            "workout_type": request.workout_type,
            "equipment": request.equipment,
            "duration_minutes": request.duration_minutes,
        });
        let output = run_prompt(
            &resources.database,
            resources.llm.as_ref(),
            WORKOUT_GENERATION,
            user_id.as_deref(),
            &inputs,
        )
        .await?;
        let template = parse_json_output(&output).unwrap_or_else(|| json!({ "raw": output }));
        Ok((StatusCode::OK, Json(json!({ "template": template }))).into_response())
    }

    async fn handle_create_template(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<CreateTemplateRequest>,
    ) -> Result<Response, AppError> {
        let raw_user = request
            .user_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::invalid_input("user_id is required"))?;
        if request.title.trim().is_empty() {
            return Err(AppError::invalid_input("title is required"));
        }
        let user_id = ensure_user(&resources.database, raw_user).await?;

        let exercises =
            training::resolve_template_exercises(&resources.database, &request.exercises).await?;
        let workouts = resources.database.workouts();
        let template_id = workouts
            .create_template(
                &user_id,
                request.title.trim(),
                request.description.as_deref(),
                &request.mode,
                &Value::Null,
            )
            .await?;
        workouts
            .add_template_exercises(&template_id, &exercises)
            .await?;

        info!(user_id = %user_id, template_id = %template_id, "Template created");
        Ok((StatusCode::OK, Json(json!({ "template_id": template_id }))).into_response())
    }

    async fn handle_list_templates(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<UserQuery>,
    ) -> Result<Response, AppError> {
        let templates = resources
            .database
            .workouts()
            .list_templates(&normalize_user_id(&query.user_id), None)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "templates": templates }))).into_response())
    }

    async fn handle_get_template(
        State(resources): State<Arc<ServerResources>>,
        Path(template_id): Path<String>,
    ) -> Result<Response, AppError> {
        let detail = training::template_detail(&resources.database, &template_id).await?;
        Ok((StatusCode::OK, Json(detail)).into_response())
    }

    async fn handle_update_template(
        State(resources): State<Arc<ServerResources>>,
        Path(template_id): Path<String>,
        Json(request): Json<UpdateTemplateRequest>,
    ) -> Result<Response, AppError> {
        let workouts = resources.database.workouts();
        let updated = workouts
            .update_template(
                &template_id,
                request.title.as_deref(),
                request.description.as_deref(),
                request.mode.as_deref(),
            )
            .await?;
        if !updated {
            return Err(AppError::not_found("Template"));
        }

        if let Some(inputs) = &request.exercises {
            let exercises = training::resolve_template_exercises(&resources.database, inputs).await?;
            workouts
                .replace_template_exercises(&template_id, &exercises)
                .await?;
        }
        Ok((StatusCode::OK, Json(json!({ "template_id": template_id }))).into_response())
    }

    async fn handle_delete_template(
        State(resources): State<Arc<ServerResources>>,
        Path(template_id): Path<String>,
    ) -> Result<Response, AppError> {
        if !resources
            .database
            .workouts()
            .delete_template(&template_id)
            .await?
        {
            return Err(AppError::not_found("Template"));
        }
        Ok((StatusCode::OK, Json(json!({ "template_id": template_id }))).into_response())
    }

    async fn handle_duplicate_template(
        State(resources): State<Arc<ServerResources>>,
        Path(template_id): Path<String>,
        body: Option<Json<DuplicateTemplateRequest>>,
    ) -> Result<Response, AppError> {
        let request = body.map(|Json(r)| r).unwrap_or_default();
        let owner = match request.user_id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(raw) => Some(ensure_user(&resources.database, raw).await?),
            None => None,
        };
        let copy_id = training::duplicate_template(
            &resources.database,
            &template_id,
            owner.as_deref(),
            request.title.as_deref(),
        )
        .await?;
        Ok((StatusCode::OK, Json(json!({ "template_id": copy_id }))).into_response())
    }

    async fn handle_list_sessions(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<UserQuery>,
    ) -> Result<Response, AppError> {
        let sessions = resources
            .database
            .workouts()
            .list_sessions(&normalize_user_id(&query.user_id), SESSION_LIST_LIMIT)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "sessions": sessions }))).into_response())
    }

    async fn handle_start_session(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<StartSessionRequest>,
    ) -> Result<Response, AppError> {
        let user_id = ensure_user(&resources.database, &request.user_id).await?;
        let session_id = resources
            .database
            .workouts()
            .start_session(&user_id, request.template_id.as_deref(), &request.status)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "session_id": session_id }))).into_response())
    }

    async fn handle_log_exercise(
        State(resources): State<Arc<ServerResources>>,
        Path(session_id): Path<String>,
        Json(request): Json<LogExerciseRequest>,
    ) -> Result<Response, AppError> {
        if request.exercise_name.trim().is_empty() {
            return Err(AppError::invalid_input("exercise_name is required"));
        }
        let workouts = resources.database.workouts();
        if workouts.get_session(&session_id).await?.is_none() {
            return Err(AppError::not_found("Session"));
        }
        let log_id = workouts
            .insert_exercise_log(&session_id, &request.into())
            .await?;
        Ok((StatusCode::OK, Json(json!({ "log_id": log_id }))).into_response())
    }

    async fn handle_complete_session(
        State(resources): State<Arc<ServerResources>>,
        Path(session_id): Path<String>,
        body: Option<Json<CompleteSessionRequest>>,
    ) -> Result<Response, AppError> {
        let request = body.map_or_else(
            || CompleteSessionRequest {
                duration_seconds: None,
                status: default_completed_status(),
            },
            |Json(r)| r,
        );
        let completion = training::complete_session(
            &resources.database,
            &session_id,
            &request.status,
            request.duration_seconds,
        )
        .await?;
        Ok((StatusCode::OK, Json(completion)).into_response())
    }

    async fn handle_session_logs(
        State(resources): State<Arc<ServerResources>>,
        Path(session_id): Path<String>,
    ) -> Result<Response, AppError> {
        let logs = resources
            .database
            .workouts()
            .session_logs(&session_id)
            .await?;
        Ok((
            StatusCode::OK,
            Json(json!({ "session_id": session_id, "logs": logs })),
        )
            .into_response())
    }

    async fn handle_exercise_history(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<HistoryQuery>,
    ) -> Result<Response, AppError> {
        let history = training::exercise_history(
            &resources.database,
            &normalize_user_id(&query.user_id),
            &query.exercise_name,
            query.limit,
        )
        .await?;
        Ok((StatusCode::OK, Json(history)).into_response())
    }
}
