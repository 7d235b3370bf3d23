// ABOUTME: Nutrition route handlers for food search, meal logs, favorites and third-party lookups
// ABOUTME: USDA and FatSecret endpoints answer 503 when their credentials are not configured
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Nutrition routes
//!
//! Local search covers the `food_items` catalogue. The `usda/*` and
//! `fatsecret/*` endpoints proxy the external databases and always return
//! foods in the shared normalized shape.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fitai_core::errors::AppError;
use fitai_core::models::MacroTargets;
use serde::Deserialize;
use serde_json::json;

use crate::database::{today, NewNutritionLog};
use crate::resources::ServerResources;
use crate::services::identity::normalize_user_id;
use crate::services::meals::{self, ManualItem};

const LOCAL_SEARCH_LIMIT: i64 = 20;
const LOG_LIST_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    query: String,
    user_id: Option<String>,
}

/// Meal log from a photo
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoLogRequest {
    pub user_id: String,
    pub meal_type: String,
    pub photo_url: Option<String>,
    pub log_date: Option<String>,
}

/// Meal log typed in by the user
#[derive(Debug, Clone, Deserialize)]
pub struct ManualLogRequest {
    pub user_id: String,
    pub meal_type: String,
    pub log_date: Option<String>,
    #[serde(default)]
    pub items: Vec<ManualItem>,
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    user_id: String,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FavoriteRequest {
    user_id: String,
    food_item_id: String,
}

const fn default_favorites_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
struct FavoritesQuery {
    user_id: String,
    #[serde(default = "default_favorites_limit")]
    limit: i64,
}

const fn default_page_size() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
struct UsdaSearchQuery {
    #[serde(default)]
    query: String,
    #[serde(default = "default_page_size")]
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct FatSecretSearchQuery {
    #[serde(default)]
    query: String,
    #[serde(default = "default_page_size")]
    max_results: u32,
    #[serde(default)]
    page: u32,
}

#[derive(Debug, Deserialize)]
struct AutocompleteQuery {
    #[serde(default)]
    expression: String,
}

/// Nutrition routes
pub struct NutritionRoutes;

impl NutritionRoutes {
    /// Create all nutrition routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/nutrition/search", get(Self::handle_search))
            .route("/nutrition/log", post(Self::handle_photo_log))
            .route("/nutrition/log/manual", post(Self::handle_manual_log))
            .route("/nutrition/logs", get(Self::handle_list_logs))
            .route(
                "/nutrition/favorites",
                get(Self::handle_list_favorites).post(Self::handle_add_favorite),
            )
            .route("/nutrition/usda/search", get(Self::handle_usda_search))
            .route("/nutrition/usda/foods/:fdc_id", get(Self::handle_usda_food))
            .route(
                "/nutrition/fatsecret/search",
                get(Self::handle_fatsecret_search),
            )
            .route(
                "/nutrition/fatsecret/foods/:food_id",
                get(Self::handle_fatsecret_food),
            )
            .route(
                "/nutrition/fatsecret/barcode/:barcode",
                get(Self::handle_fatsecret_barcode),
            )
            .route(
                "/nutrition/fatsecret/autocomplete",
                get(Self::handle_fatsecret_autocomplete),
            )
            .with_state(resources)
    }

    async fn handle_search(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<SearchQuery>,
    ) -> Result<Response, AppError> {
        let nutrition = resources.database.nutrition();
        let results = nutrition
            .search_foods(query.query.trim(), LOCAL_SEARCH_LIMIT)
            .await?;
        if let Some(raw) = query.user_id.as_deref().filter(|id| !id.trim().is_empty()) {
            nutrition
                .record_search(&normalize_user_id(raw), &query.query, "search")
                .await?;
        }
        Ok((
            StatusCode::OK,
            Json(json!({ "query": query.query, "results": results })),
        )
            .into_response())
    }

    async fn handle_photo_log(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<PhotoLogRequest>,
    ) -> Result<Response, AppError> {
        let user_id = normalize_user_id(&request.user_id);
        let date = request.log_date.clone().unwrap_or_else(today);
        let photo_url = request.photo_url.as_deref().filter(|u| !u.trim().is_empty());

        let log = if let Some(url) = photo_url {
            meals::log_photo_meal(
                &resources.database,
                resources.llm.as_ref(),
                &user_id,
                &request.meal_type,
                Some(url),
                date,
            )
            .await?
            .log
        } else {
            resources
                .database
                .nutrition()
                .insert_log(&NewNutritionLog {
                    user_id,
                    date,
                    meal_type: request.meal_type,
                    items: json!([]),
                    totals: MacroTargets::default(),
                    photo_url: None,
                })
                .await?
        };
        Ok((StatusCode::OK, Json(json!({ "log": log }))).into_response())
    }

    async fn handle_manual_log(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<ManualLogRequest>,
    ) -> Result<Response, AppError> {
        let totals = meals::manual_totals(&request.items);
        let log = resources
            .database
            .nutrition()
            .insert_log(&NewNutritionLog {
                user_id: normalize_user_id(&request.user_id),
                date: request.log_date.unwrap_or_else(today),
                meal_type: request.meal_type,
                items: json!(request.items),
                totals,
                photo_url: None,
            })
            .await?;
        Ok((StatusCode::OK, Json(json!({ "log": log }))).into_response())
    }

    async fn handle_list_logs(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<LogsQuery>,
    ) -> Result<Response, AppError> {
        let logs = resources
            .database
            .nutrition()
            .list_logs(
                &normalize_user_id(&query.user_id),
                query.date.as_deref(),
                LOG_LIST_LIMIT,
            )
            .await?;
        Ok((StatusCode::OK, Json(json!({ "logs": logs }))).into_response())
    }

    async fn handle_add_favorite(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<FavoriteRequest>,
    ) -> Result<Response, AppError> {
        resources
            .database
            .nutrition()
            .add_favorite(&normalize_user_id(&request.user_id), &request.food_item_id)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "status": "saved" }))).into_response())
    }

    async fn handle_list_favorites(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<FavoritesQuery>,
    ) -> Result<Response, AppError> {
        let user_id = normalize_user_id(&query.user_id);
        let favorites = resources
            .database
            .nutrition()
            .list_favorites(&user_id, query.limit)
            .await?;
        Ok((
            StatusCode::OK,
            Json(json!({ "user_id": user_id, "favorites": favorites })),
        )
            .into_response())
    }

    async fn handle_usda_search(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<UsdaSearchQuery>,
    ) -> Result<Response, AppError> {
        let results = resources
            .usda()?
            .search_foods(&query.query, query.page_size)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "results": results }))).into_response())
    }

    async fn handle_usda_food(
        State(resources): State<Arc<ServerResources>>,
        Path(fdc_id): Path<u64>,
    ) -> Result<Response, AppError> {
        let food = resources.usda()?.get_food(fdc_id).await?;
        Ok((StatusCode::OK, Json(json!({ "food": food }))).into_response())
    }

    async fn handle_fatsecret_search(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<FatSecretSearchQuery>,
    ) -> Result<Response, AppError> {
        let results = resources
            .fatsecret()?
            .search(&query.query, query.max_results, query.page)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "results": results }))).into_response())
    }

    async fn handle_fatsecret_food(
        State(resources): State<Arc<ServerResources>>,
        Path(food_id): Path<String>,
    ) -> Result<Response, AppError> {
        let food = resources.fatsecret()?.get_food(&food_id).await?;
        Ok((StatusCode::OK, Json(json!({ "food": food }))).into_response())
    }

    async fn handle_fatsecret_barcode(
        State(resources): State<Arc<ServerResources>>,
        Path(barcode): Path<String>,
    ) -> Result<Response, AppError> {
        let food = resources.fatsecret()?.find_by_barcode(&barcode).await?;
        Ok((StatusCode::OK, Json(json!({ "food": food }))).into_response())
    }

    async fn handle_fatsecret_autocomplete(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<AutocompleteQuery>,
    ) -> Result<Response, AppError> {
        let suggestions = resources
            .fatsecret()?
            .autocomplete(&query.expression)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "suggestions": suggestions }))).into_response())
    }
}
