// ABOUTME: Check-in route handlers for weekly progress reports and daily streak check-ins
// ABOUTME: Weekly reports adjust macro targets; daily check-ins answer with a coach one-liner
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Check-in routes
//!
//! `/checkins` is the weekly report analysed by the model. `/streaks/*` is
//! the three-question daily check-in that feeds the streak counter.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fitai_core::errors::AppError;
use fitai_core::models::{SleepQuality, TrainingStatus};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::today;
use crate::resources::ServerResources;
use crate::services::checkins::{
    self, DailyAnswers, PhotoRetention, WeeklyCheckinInput,
};
use crate::services::identity::normalize_user_id;

/// Weekly check-in request
#[derive(Debug, Clone, Deserialize)]
pub struct WeeklyCheckinRequest {
    pub user_id: String,
    #[serde(default)]
    pub adherence: Value,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    pub checkin_date: Option<String>,
}

const fn default_checkin_limit() -> i64 {
    12
}

#[derive(Debug, Deserialize)]
struct CheckinListQuery {
    user_id: String,
    #[serde(default = "default_checkin_limit")]
    limit: i64,
}

/// Daily check-in request
#[derive(Debug, Clone, Deserialize)]
pub struct DailyCheckinRequest {
    pub user_id: String,
    pub hit_macros: bool,
    pub training_status: TrainingStatus,
    pub sleep_quality: SleepQuality,
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user_id: String,
}

/// Check-in and streak routes
pub struct CheckinRoutes;

impl CheckinRoutes {
    /// Create all check-in routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/checkins",
                get(Self::handle_list_weekly).post(Self::handle_submit_weekly),
            )
            .route("/streaks/daily-checkin", post(Self::handle_submit_daily))
            .route(
                "/streaks/daily-checkin/status",
                get(Self::handle_daily_status),
            )
            .with_state(resources)
    }

    async fn handle_submit_weekly(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<WeeklyCheckinRequest>,
    ) -> Result<Response, AppError> {
        let input = WeeklyCheckinInput {
            user_id: normalize_user_id(&request.user_id),
            adherence: request.adherence,
            photo_urls: request.photo_urls,
            checkin_date: request.checkin_date,
        };
        let storage = &resources.config.storage;
        let retention = PhotoRetention {
            blob_store: resources.blob_store.as_ref(),
            bucket: &storage.progress_photo_bucket,
            keep: storage.checkin_photo_retention,
        };
        let outcome = checkins::submit_weekly(
            &resources.database,
            resources.llm.as_ref(),
            &retention,
            &input,
        )
        .await?;
        Ok((StatusCode::OK, Json(outcome)).into_response())
    }

    async fn handle_list_weekly(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<CheckinListQuery>,
    ) -> Result<Response, AppError> {
        let checkins = resources
            .database
            .checkins()
            .list_weekly(&normalize_user_id(&query.user_id), query.limit)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "checkins": checkins }))).into_response())
    }

    async fn handle_submit_daily(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<DailyCheckinRequest>,
    ) -> Result<Response, AppError> {
        let answers = DailyAnswers {
            hit_macros: request.hit_macros,
            training_status: request.training_status,
            sleep_quality: request.sleep_quality,
        };
        let outcome = checkins::submit_daily(
            &resources.database,
            resources.llm.as_ref(),
            &normalize_user_id(&request.user_id),
            answers,
        )
        .await;
        Ok((StatusCode::OK, Json(outcome)).into_response())
    }

    async fn handle_daily_status(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<UserQuery>,
    ) -> Result<Response, AppError> {
        let checkin = resources
            .database
            .checkins()
            .daily_for_date(&normalize_user_id(&query.user_id), &today())
            .await?;
        let body = checkin.map_or_else(
            || json!({ "completed": false }),
            |c| json!({ "completed": true, "checkin": c }),
        );
        Ok((StatusCode::OK, Json(body)).into_response())
    }
}
