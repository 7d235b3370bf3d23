// ABOUTME: Integration tests for meal logging, favorites and food database lookups
// ABOUTME: Uses the scripted LLM for photo parses and mockito for the USDA proxy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use std::sync::Arc;

use axum::http::StatusCode;
use common::create_test_context;
use fitai_core::models::MacroTargets;
use fitai_server::external::{UsdaClient, UsdaClientConfig};
use fitai_server::routes::NutritionRoutes;
use fitai_server::services::identity::normalize_user_id;
use helpers::axum_test::AxumTestRequest;
use mockito::{Matcher, Server};
use serde_json::{json, Value};

#[tokio::test]
async fn test_manual_log_sums_items() {
    let ctx = create_test_context().await.unwrap();
    let app = NutritionRoutes::routes(ctx.resources.clone());

    let body: Value = AxumTestRequest::post("/nutrition/log/manual")
        .json(&json!({
            "user_id": "eater",
            "meal_type": "breakfast",
            "log_date": "2025-02-01",
            "items": [
                { "name": "eggs", "calories": 140, "protein": 12, "carbs": 1, "fats": 10 },
                { "name": "toast", "calories": 80, "protein": 3, "carbs": 15, "fats": 1 }
            ]
        }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["log"]["totals"]["calories"], 220.0);
    assert_eq!(body["log"]["totals"]["protein"], 15.0);
    assert_eq!(body["log"]["items"].as_array().unwrap().len(), 2);

    let logs: Value = AxumTestRequest::get("/nutrition/logs?user_id=eater&date=2025-02-01")
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(logs["logs"].as_array().unwrap().len(), 1);

    let other_day: Value = AxumTestRequest::get("/nutrition/logs?user_id=eater&date=2025-02-02")
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert!(other_day["logs"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_photo_log_parses_model_items() {
    let ctx = create_test_context().await.unwrap();
    ctx.llm.push_text(
        r#"{"items":[{"name":"rice","calories":200,"protein":4,"carbs":44,"fats":0.5},
                     {"name":"salmon","calories":280,"protein":30,"carbs":0,"fats":17}]}"#,
    );
    let app = NutritionRoutes::routes(ctx.resources.clone());

    let body: Value = AxumTestRequest::post("/nutrition/log")
        .json(&json!({
            "user_id": "eater",
            "meal_type": "dinner",
            "photo_url": "http://localhost:8000/uploads/meal-photos/plate.jpg"
        }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["log"]["totals"]["calories"], 480.0);
    assert_eq!(body["log"]["items"][1]["name"], "salmon");
    assert_eq!(
        body["log"]["photo_url"],
        "http://localhost:8000/uploads/meal-photos/plate.jpg"
    );

    let request = &ctx.llm.requests()[0];
    let user_turn = request.messages.last().unwrap();
    assert_eq!(
        user_turn.image_urls,
        vec!["http://localhost:8000/uploads/meal-photos/plate.jpg".to_owned()]
    );
}

#[tokio::test]
async fn test_log_without_photo_is_empty() {
    let ctx = create_test_context().await.unwrap();
    let app = NutritionRoutes::routes(ctx.resources.clone());

    let body: Value = AxumTestRequest::post("/nutrition/log")
        .json(&json!({ "user_id": "eater", "meal_type": "snack" }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["log"]["items"], json!([]));
    assert_eq!(body["log"]["totals"]["calories"], 0.0);
    assert_eq!(ctx.llm.call_count(), 0);
}

#[tokio::test]
async fn test_local_search_and_favorites() {
    let ctx = create_test_context().await.unwrap();
    let food = ctx
        .database()
        .nutrition()
        .create_food_item(
            "Greek Yogurt",
            Some("Fage"),
            Some((170.0, "g")),
            &MacroTargets {
                calories: 100.0,
                protein: 18.0,
                carbs: 6.0,
                fats: 0.0,
            },
            "manual",
        )
        .await
        .unwrap();
    let app = NutritionRoutes::routes(ctx.resources.clone());

    let found: Value = AxumTestRequest::get("/nutrition/search?query=yogurt&user_id=eater")
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(found["results"][0]["name"], "Greek Yogurt");
    assert_eq!(
        ctx.database()
            .nutrition()
            .count_searches(&normalize_user_id("eater"))
            .await
            .unwrap(),
        1
    );

    AxumTestRequest::post("/nutrition/favorites")
        .json(&json!({ "user_id": "eater", "food_item_id": food.id }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);

    let favorites: Value = AxumTestRequest::get("/nutrition/favorites?user_id=eater")
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(favorites["favorites"].as_array().unwrap().len(), 1);
    assert_eq!(favorites["favorites"][0]["food_item_id"], food.id.as_str());
}

#[tokio::test]
async fn test_food_databases_unconfigured() {
    let ctx = create_test_context().await.unwrap();
    let app = NutritionRoutes::routes(ctx.resources.clone());

    for uri in [
        "/nutrition/usda/search?query=apple",
        "/nutrition/usda/foods/171688",
        "/nutrition/fatsecret/search?query=apple",
        "/nutrition/fatsecret/barcode/0123456789012",
        "/nutrition/fatsecret/autocomplete?expression=app",
    ] {
        let body: Value = AxumTestRequest::get(uri)
            .send(app.clone())
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE)
            .json();
        assert_eq!(body["error"]["code"], "EXTERNAL_SERVICE_UNAVAILABLE");
    }
}

#[tokio::test]
async fn test_usda_search_proxies_normalized_foods() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/foods/search")
        .match_query(Matcher::UrlEncoded("query".into(), "banana".into()))
        .with_status(200)
        .with_body(
            r#"{"foods":[{"fdcId":173944,"description":"Bananas, raw",
                "foodNutrients":[{"nutrientId":1008,"value":89},{"nutrientId":1003,"value":1.1}]}]}"#,
        )
        .create_async()
        .await;

    let ctx = create_test_context().await.unwrap();
    let resources = (*ctx.resources).clone().with_usda(UsdaClient::new(UsdaClientConfig {
        api_key: "test-key".to_owned(),
        base_url: server.url(),
        ..UsdaClientConfig::default()
    }));
    let app = NutritionRoutes::routes(Arc::new(resources));

    let body: Value = AxumTestRequest::get("/nutrition/usda/search?query=banana")
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    mock.assert_async().await;
    assert_eq!(body["results"][0]["name"], "Bananas, raw");
    assert_eq!(body["results"][0]["external_id"], "173944");
    assert_eq!(body["results"][0]["calories"], 89.0);
}
