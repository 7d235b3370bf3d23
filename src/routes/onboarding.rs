// ABOUTME: Onboarding route handler for the mobile intake form
// ABOUTME: Thin wrapper over the onboarding service that returns the starter plan
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use fitai_core::errors::AppError;

use crate::resources::ServerResources;
use crate::services::onboarding::{self, OnboardingForm};

/// Onboarding routes
pub struct OnboardingRoutes;

impl OnboardingRoutes {
    /// Create all onboarding routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/onboarding", post(Self::handle_submit))
            .with_state(resources)
    }

    async fn handle_submit(
        State(resources): State<Arc<ServerResources>>,
        Json(form): Json<OnboardingForm>,
    ) -> Result<Response, AppError> {
        let outcome =
            onboarding::submit(&resources.database, resources.llm.as_ref(), &form).await?;
        Ok((StatusCode::OK, Json(outcome)).into_response())
    }
}
