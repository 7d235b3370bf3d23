// ABOUTME: Integration tests for weekly check-ins and daily streak check-ins
// ABOUTME: Covers clamped macro adjustments, photo retention and fallback coach replies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use common::{create_test_context, create_test_context_with, seed_profile};
use fitai_server::routes::CheckinRoutes;
use fitai_server::services::identity::normalize_user_id;
use helpers::axum_test::AxumTestRequest;
use serde_json::{json, Value};

#[tokio::test]
async fn test_weekly_checkin_applies_clamped_delta() {
    let ctx = create_test_context().await.unwrap();
    let user_id = normalize_user_id("weekly-user");
    seed_profile(ctx.database(), &user_id).await.unwrap();
    ctx.llm.push_text(
        &json!({
            "summary": "Weight is flat, trim carbs",
            "macro_delta": { "calories": -500, "protein": 10, "carbs": -80, "fats": 0 },
            "cardio": { "sessions": 3 }
        })
        .to_string(),
    );
    let app = CheckinRoutes::routes(ctx.resources.clone());

    let body: Value = AxumTestRequest::post("/checkins")
        .json(&json!({
            "user_id": "weekly-user",
            "adherence": { "current_weight": "81.5", "workouts_completed": 4 }
        }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();

    assert_eq!(body["status"], "complete");
    assert!(body["ai_result"].as_str().unwrap().contains("trim carbs"));
    let update = &body["macro_update"];
    assert_eq!(update["applied"], true);
    assert_eq!(update["delta"]["calories"], -300.0);
    assert_eq!(update["delta"]["carbs"], -50.0);
    assert_eq!(update["updated"]["calories"], 2200.0);
    assert_eq!(update["updated"]["protein"], 190.0);
    assert_eq!(update["updated"]["carbs"], 200.0);
    assert_eq!(update["updated"]["fats"], 80.0);

    let profile = ctx
        .database()
        .profiles()
        .get(&user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.macros["calories"], 2200.0);

    let listed: Value = AxumTestRequest::get("/checkins?user_id=weekly-user")
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    let checkins = listed["checkins"].as_array().unwrap();
    assert_eq!(checkins.len(), 1);
    assert_eq!(checkins[0]["weight"], 81.5);
    assert_eq!(checkins[0]["cardio_update"]["sessions"], 3);
}

#[tokio::test]
async fn test_weekly_checkin_ignores_non_finite_and_non_numeric_delta() {
    let ctx = create_test_context().await.unwrap();
    let user_id = normalize_user_id("odd-delta-user");
    seed_profile(ctx.database(), &user_id).await.unwrap();
    ctx.llm.push_text(
        r#"{"macro_delta": {"calories": "NaN", "protein": "inf", "carbs": "lots", "fats": "-Infinity"}}"#,
    );
    let app = CheckinRoutes::routes(ctx.resources.clone());

    let body: Value = AxumTestRequest::post("/checkins")
        .json(&json!({ "user_id": "odd-delta-user" }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    let update = &body["macro_update"];
    assert_eq!(update["applied"], false);
    assert_eq!(update["delta"]["calories"], 0.0);
    assert_eq!(update["delta"]["protein"], 0.0);
    assert_eq!(update["delta"]["fats"], 0.0);

    ctx.llm
        .push_text(r#"{"macro_delta": {"calories": "NaN", "protein": "12", "carbs": 0, "fats": 0}}"#);
    let partial: Value = AxumTestRequest::post("/checkins")
        .json(&json!({ "user_id": "odd-delta-user" }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(partial["macro_update"]["applied"], true);
    assert_eq!(partial["macro_update"]["updated"]["calories"], 2500.0);
    assert_eq!(partial["macro_update"]["updated"]["protein"], 192.0);

    let profile = ctx
        .database()
        .profiles()
        .get(&user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.macros["calories"], 2500.0);
}

#[tokio::test]
async fn test_weekly_checkin_without_targets_skips_update() {
    let ctx = create_test_context().await.unwrap();
    ctx.llm
        .push_text(r#"{"macro_delta": {"calories": -200, "protein": 0, "carbs": 0, "fats": 0}}"#);
    let app = CheckinRoutes::routes(ctx.resources.clone());

    let body: Value = AxumTestRequest::post("/checkins")
        .json(&json!({ "user_id": "no-profile" }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["macro_update"]["applied"], false);
    assert!(body["macro_update"]["updated"].is_null());
}

#[tokio::test]
async fn test_old_checkin_photos_are_cleared() {
    let ctx = create_test_context_with(|config| config.storage.checkin_photo_retention = 1)
        .await
        .unwrap();
    let app = CheckinRoutes::routes(ctx.resources.clone());

    for (date, photo) in [("2025-01-05", "a.jpg"), ("2025-01-12", "b.jpg")] {
        ctx.llm.push_text("{}");
        AxumTestRequest::post("/checkins")
            .json(&json!({
                "user_id": "photo-user",
                "checkin_date": date,
                "photo_urls": [format!("http://localhost:8000/uploads/progress-photos/{photo}")]
            }))
            .send(app.clone())
            .await
            .assert_status(StatusCode::OK);
    }

    let listed: Value = AxumTestRequest::get("/checkins?user_id=photo-user")
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    let checkins = listed["checkins"].as_array().unwrap();
    assert_eq!(checkins.len(), 2);
    let newest = checkins.iter().find(|c| c["date"] == "2025-01-12").unwrap();
    let oldest = checkins.iter().find(|c| c["date"] == "2025-01-05").unwrap();
    assert_eq!(newest["photos"].as_array().unwrap().len(), 1);
    assert!(oldest["photos"].is_null());
}

async fn upload_progress_photo(app: axum::Router, user: &str) -> String {
    let body: Value = AxumTestRequest::post("/progress/photos")
        .form_text("user_id", user)
        .form_text("checkin_date", "2025-01-05")
        .form_file("photo", "front.jpg", "image/jpeg", &[0xFF, 0xD8, 0xFF, 0xE0])
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    body["photo_url"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_retention_never_deletes_another_users_photo() {
    let ctx = create_test_context_with(|config| config.storage.checkin_photo_retention = 1)
        .await
        .unwrap();
    let on_disk = |url: &str| {
        ctx.uploads
            .path()
            .join(url.trim_start_matches("http://localhost:8000/uploads/"))
    };

    let victim_url = upload_progress_photo(ctx.app(), "victim").await;
    let own_url = upload_progress_photo(ctx.app(), "borrower").await;
    assert!(on_disk(&victim_url).exists());
    assert!(on_disk(&own_url).exists());

    for (date, photos) in [
        ("2025-01-05", vec![victim_url.clone(), own_url.clone()]),
        ("2025-01-12", vec![]),
    ] {
        ctx.llm.push_text("{}");
        AxumTestRequest::post("/checkins")
            .json(&json!({ "user_id": "borrower", "checkin_date": date, "photo_urls": photos }))
            .send(ctx.app())
            .await
            .assert_status(StatusCode::OK);
    }

    assert!(on_disk(&victim_url).exists());
    assert!(!on_disk(&own_url).exists());

    let victim_photos: Value = AxumTestRequest::get("/progress/photos?user_id=victim")
        .send(ctx.app())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(victim_photos["photos"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_daily_checkin_and_status() {
    let ctx = create_test_context().await.unwrap();
    ctx.llm.push_text("Solid work, sleep is the next lever.");
    let app = CheckinRoutes::routes(ctx.resources.clone());

    let before: Value = AxumTestRequest::get("/streaks/daily-checkin/status?user_id=daily-user")
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(before, json!({ "completed": false }));

    let body: Value = AxumTestRequest::post("/streaks/daily-checkin")
        .json(&json!({
            "user_id": "daily-user",
            "hit_macros": true,
            "training_status": "trained",
            "sleep_quality": "poor"
        }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["coach_response"], "Solid work, sleep is the next lever.");
    assert_eq!(body["streak_saved"], true);
    assert_eq!(body["current_streak"], 1);

    let after: Value = AxumTestRequest::get("/streaks/daily-checkin/status?user_id=daily-user")
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(after["completed"], true);
    assert_eq!(after["checkin"]["training_status"], "trained");
    assert_eq!(after["checkin"]["sleep_quality"], "poor");
}

#[tokio::test]
async fn test_daily_checkin_falls_back_when_model_fails() {
    let ctx = create_test_context().await.unwrap();
    ctx.llm.push_error("timeout");
    let app = CheckinRoutes::routes(ctx.resources.clone());

    let body: Value = AxumTestRequest::post("/streaks/daily-checkin")
        .json(&json!({
            "user_id": "fallback-user",
            "hit_macros": false,
            "training_status": "off_day",
            "sleep_quality": "okay"
        }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    let reply = body["coach_response"].as_str().unwrap();
    assert!(!reply.is_empty());
    assert_eq!(body["current_streak"], 1);
}

#[tokio::test]
async fn test_daily_checkin_rejects_unknown_answers() {
    let ctx = create_test_context().await.unwrap();
    let app = CheckinRoutes::routes(ctx.resources.clone());

    let response = AxumTestRequest::post("/streaks/daily-checkin")
        .json(&json!({
            "user_id": "u",
            "hit_macros": true,
            "training_status": "maybe",
            "sleep_quality": "good"
        }))
        .send(app)
        .await;
    assert!(response.status() >= 400 && response.status() < 500);
}
