// ABOUTME: Profile and user-settings route handlers
// ABOUTME: Partial profile updates, macro generation, tutorial state and check-in day
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Profile routes
//!
//! `/profiles/{user_id}` manages the body stats, goal, macro targets and
//! preferences collected during onboarding. `/users/*` holds the small
//! per-user settings the app toggles outside the profile screen.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use fitai_core::errors::AppError;
use fitai_core::models::MacroTargets;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::ProfileUpdate;
use crate::resources::ServerResources;
use crate::services::identity::normalize_user_id;
use crate::services::macros;

/// Fields a client may change; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdateRequest {
    pub full_name: Option<String>,
    pub age: Option<i64>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub goal: Option<String>,
    pub macros: Option<MacroTargets>,
    pub preferences: Option<Value>,
    /// A plain string or a unit settings object
    pub units: Option<Value>,
    pub subscription_status: Option<String>,
}

impl ProfileUpdateRequest {
    fn into_update(self) -> ProfileUpdate {
        let units = self.units.and_then(|units| match units {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });
        ProfileUpdate {
            full_name: self.full_name,
            age: self.age,
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            goal: self.goal,
            macros: self.macros.map(|m| json!(m)),
            preferences: self.preferences,
            units,
            subscription_status: self.subscription_status,
            ..ProfileUpdate::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user_id: String,
}

const fn default_completed() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct TutorialRequest {
    user_id: String,
    #[serde(default = "default_completed")]
    completed: bool,
}

#[derive(Debug, Deserialize)]
struct CheckInDayRequest {
    user_id: String,
    check_in_day: String,
}

/// Profile routes
pub struct ProfileRoutes;

impl ProfileRoutes {
    /// Create all profile and user-settings routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/profiles/:user_id",
                get(Self::handle_get).put(Self::handle_update),
            )
            .route(
                "/profiles/:user_id/macros/generate",
                post(Self::handle_generate_macros),
            )
            .route("/users/me", get(Self::handle_me))
            .route("/users/tutorial/complete", post(Self::handle_tutorial))
            .route("/users/checkin-day", put(Self::handle_check_in_day))
            .with_state(resources)
    }

    async fn load_profile(resources: &ServerResources, raw_id: &str) -> Result<Response, AppError> {
        let profile = resources
            .database
            .profiles()
            .get(&normalize_user_id(raw_id))
            .await?
            .ok_or_else(|| AppError::not_found("Profile"))?;
        Ok((StatusCode::OK, Json(json!({ "profile": profile }))).into_response())
    }

    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        Path(user_id): Path<String>,
    ) -> Result<Response, AppError> {
        Self::load_profile(&resources, &user_id).await
    }

    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        Path(user_id): Path<String>,
        Json(request): Json<ProfileUpdateRequest>,
    ) -> Result<Response, AppError> {
        let profile = resources
            .database
            .profiles()
            .upsert(&normalize_user_id(&user_id), &request.into_update())
            .await?;
        Ok((StatusCode::OK, Json(json!({ "profile": profile }))).into_response())
    }

    async fn handle_generate_macros(
        State(resources): State<Arc<ServerResources>>,
        Path(user_id): Path<String>,
    ) -> Result<Response, AppError> {
        let generated = macros::generate_for_profile(
            &resources.database,
            resources.llm.as_ref(),
            &normalize_user_id(&user_id),
        )
        .await?;
        Ok((StatusCode::OK, Json(generated)).into_response())
    }

    async fn handle_me(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<UserQuery>,
    ) -> Result<Response, AppError> {
        Self::load_profile(&resources, &query.user_id).await
    }

    async fn handle_tutorial(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<TutorialRequest>,
    ) -> Result<Response, AppError> {
        let profile = resources
            .database
            .profiles()
            .set_tutorial_completed(&normalize_user_id(&request.user_id), request.completed)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "profile": profile }))).into_response())
    }

    async fn handle_check_in_day(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<CheckInDayRequest>,
    ) -> Result<Response, AppError> {
        if request.check_in_day.trim().is_empty() {
            return Err(AppError::invalid_input("check_in_day is required"));
        }
        let profile = resources
            .database
            .profiles()
            .set_check_in_day(&normalize_user_id(&request.user_id), request.check_in_day.trim())
            .await?;
        Ok((StatusCode::OK, Json(json!({ "profile": profile }))).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_object_is_serialized() {
        let request: ProfileUpdateRequest = serde_json::from_value(json!({
            "units": {"weight": "lbs", "height": "ft"}
        }))
        .unwrap();
        let update = request.into_update();
        let units: Value = serde_json::from_str(update.units.as_deref().unwrap()).unwrap();
        assert_eq!(units["weight"], "lbs");
    }

    #[test]
    fn test_units_string_is_kept() {
        let request: ProfileUpdateRequest =
            serde_json::from_value(json!({ "units": "metric", "goal": "cut" })).unwrap();
        let update = request.into_update();
        assert_eq!(update.units.as_deref(), Some("metric"));
        assert_eq!(update.goal.as_deref(), Some("cut"));
        assert!(update.macros.is_none());
    }
}
