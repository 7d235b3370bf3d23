// ABOUTME: Integration tests for onboarding and the profile endpoints
// ABOUTME: Exercises intake persistence, macro generation sources and user settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use common::{create_test_context, seed_profile};
use fitai_server::routes::{OnboardingRoutes, ProfileRoutes};
use fitai_server::services::identity::normalize_user_id;
use helpers::axum_test::AxumTestRequest;
use serde_json::{json, Value};

#[tokio::test]
async fn test_onboarding_stores_profile_and_starter_plan() {
    let ctx = create_test_context().await.unwrap();
    ctx.llm.push_text("Day 1: Squat 3x8, Row 3x10");
    let app = OnboardingRoutes::routes(ctx.resources.clone());

    let body: Value = AxumTestRequest::post("/onboarding")
        .json(&json!({
            "user_id": "new-lifter",
            "full_name": "Sam Doe",
            "age": 28,
            "height_feet": "5",
            "height_inches": "10",
            "weight_lbs": "180",
            "goal": "build_muscle",
            "training_days": 4,
            "gym_access": "home",
            "equipment": ["dumbbells"],
            "experience": "beginner",
            "macro_calories": "2600",
            "macro_protein": 170,
            "coach_interest": true
        }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();

    let user_id = normalize_user_id("new-lifter");
    assert_eq!(body["user_id"], user_id.as_str());
    assert_eq!(body["workout_plan"], "Day 1: Squat 3x8, Row 3x10");

    let profile = ctx
        .database()
        .profiles()
        .get(&user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.full_name.as_deref(), Some("Sam Doe"));
    assert_eq!(profile.age, Some(28));
    assert!((profile.height_cm.unwrap() - 177.8).abs() < 0.01);
    assert!((profile.weight_kg.unwrap() - 81.65).abs() < 0.01);

    let templates = ctx
        .database()
        .workouts()
        .list_templates(&user_id, None)
        .await
        .unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].title, "Starter plan");

    assert_eq!(
        ctx.database()
            .profiles()
            .count_onboarding_states(&user_id)
            .await
            .unwrap(),
        1
    );
    assert_eq!(ctx.llm.call_count(), 1);
}

#[tokio::test]
async fn test_profile_update_then_fetch() {
    let ctx = create_test_context().await.unwrap();
    let app = ProfileRoutes::routes(ctx.resources.clone());

    AxumTestRequest::put("/profiles/athlete-1")
        .json(&json!({
            "full_name": "Jo",
            "goal": "cut",
            "units": "metric",
            "macros": { "calories": 2000, "protein": 150, "carbs": 200, "fats": 60 }
        }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);

    let fetched: Value = AxumTestRequest::get("/profiles/athlete-1")
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(fetched["profile"]["full_name"], "Jo");
    assert_eq!(fetched["profile"]["goal"], "cut");
    assert_eq!(fetched["profile"]["units"], "metric");

    let me: Value = AxumTestRequest::get("/users/me?user_id=athlete-1")
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(me["profile"]["user_id"], fetched["profile"]["user_id"]);
}

#[tokio::test]
async fn test_missing_profile_is_not_found() {
    let ctx = create_test_context().await.unwrap();
    let app = ProfileRoutes::routes(ctx.resources.clone());

    let body: Value = AxumTestRequest::get("/profiles/nobody")
        .send(app.clone())
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .json();
    assert_eq!(body["error"]["code"], "RESOURCE_NOT_FOUND");

    AxumTestRequest::post("/profiles/nobody/macros/generate")
        .send(app)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    assert_eq!(ctx.llm.call_count(), 0);
}

#[tokio::test]
async fn test_generate_macros_uses_model_output() {
    let ctx = create_test_context().await.unwrap();
    let user_id = normalize_user_id("macro-user");
    seed_profile(ctx.database(), &user_id).await.unwrap();
    ctx.llm.push_text(
        r#"```json
{"calories": 2700, "protein": 190, "carbs": "300", "fats": 75}
```"#,
    );
    let app = ProfileRoutes::routes(ctx.resources.clone());

    let body: Value = AxumTestRequest::post("/profiles/macro-user/macros/generate")
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["source"], "ai");
    assert_eq!(body["macros"]["calories"], 2700.0);
    assert_eq!(body["macros"]["carbs"], 300.0);

    let stored = ctx
        .database()
        .profiles()
        .get(&user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.macros["calories"], 2700.0);
}

#[tokio::test]
async fn test_generate_macros_falls_back_to_formula() {
    let ctx = create_test_context().await.unwrap();
    let user_id = normalize_user_id("formula-user");
    seed_profile(ctx.database(), &user_id).await.unwrap();
    ctx.llm.push_error("rate limited");
    let app = ProfileRoutes::routes(ctx.resources.clone());

    let body: Value = AxumTestRequest::post("/profiles/formula-user/macros/generate")
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["source"], "formula");
    // 2.0 g per kg at 80 kg
    assert_eq!(body["macros"]["protein"], 160.0);
    assert!(body["macros"]["calories"].as_f64().unwrap() >= 1200.0);
}

#[tokio::test]
async fn test_tutorial_and_check_in_day() {
    let ctx = create_test_context().await.unwrap();
    let app = ProfileRoutes::routes(ctx.resources.clone());

    let tutorial: Value = AxumTestRequest::post("/users/tutorial/complete")
        .json(&json!({ "user_id": "settings-user" }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(tutorial["profile"]["tutorial_completed"], true);
    assert!(tutorial["profile"]["tutorial_completed_at"].is_string());

    let day: Value = AxumTestRequest::put("/users/checkin-day")
        .json(&json!({ "user_id": "settings-user", "check_in_day": "sunday" }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(day["profile"]["check_in_day"], "sunday");
    assert_eq!(day["profile"]["tutorial_completed"], true);

    AxumTestRequest::put("/users/checkin-day")
        .json(&json!({ "user_id": "settings-user", "check_in_day": "  " }))
        .send(app)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
