// ABOUTME: Payment route handlers recording Stripe events reported by the client
// ABOUTME: Records are append-only and listed newest first
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

use crate::database::NewPaymentRecord;
use crate::resources::ServerResources;
use crate::services::identity::normalize_user_id;

const fn default_payment_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
struct PaymentListQuery {
    #[serde(default = "default_payment_limit")]
    limit: i64,
}

/// Payment record routes
pub struct PaymentRoutes;

impl PaymentRoutes {
    /// Create all payment routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/payments/record", post(Self::handle_record))
            .route("/payments/user/:user_id", get(Self::handle_list))
            .with_state(resources)
    }

    async fn handle_record(
        State(resources): State<Arc<ServerResources>>,
        Json(mut request): Json<NewPaymentRecord>,
    ) -> Result<Response, AppError> {
        if request.kind.trim().is_empty() || request.status.trim().is_empty() {
            return Err(AppError::invalid_input("type and status are required"));
        }
        request.user_id = normalize_user_id(&request.user_id);
        let record = resources.database.payments().record(&request).await?;
        Ok((StatusCode::OK, Json(json!({ "record": record }))).into_response())
    }

    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        Path(user_id): Path<String>,
        Query(query): Query<PaymentListQuery>,
    ) -> Result<Response, AppError> {
        let user_id = normalize_user_id(&user_id);
        let records = resources
            .database
            .payments()
            .list_for_user(&user_id, query.limit)
            .await?;
        Ok((
            StatusCode::OK,
            Json(json!({ "user_id": user_id, "records": records })),
        )
            .into_response())
    }
}
