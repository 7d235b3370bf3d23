// ABOUTME: Integration tests for workout generation, templates, sessions and history
// ABOUTME: Verifies catalogue enrichment, template copies and estimated 1RM personal records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use axum::Router;
use common::{create_test_context, workout_plan_json};
use fitai_server::routes::WorkoutRoutes;
use helpers::axum_test::AxumTestRequest;
use serde_json::{json, Value};

async fn create_template(app: Router) -> String {
    let body: Value = AxumTestRequest::post("/workouts/templates")
        .json(&json!({
            "user_id": "lifter",
            "title": "Upper A",
            "description": "Heavy upper day",
            "exercises": [
                { "name": "Bench Press", "muscle_groups": ["chest"], "equipment": ["barbell"],
                  "sets": 4, "reps": 6, "rest_seconds": 120 },
                { "name": "Barbell Row", "muscle_groups": ["back"], "sets": 3, "reps": 8 }
            ]
        }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    body["template_id"].as_str().unwrap().to_owned()
}

async fn log_set(app: Router, session_id: &str, name: &str, reps: i64, weight: f64) {
    AxumTestRequest::post(&format!("/workouts/sessions/{session_id}/log"))
        .json(&json!({ "exercise_name": name, "sets": 1, "reps": reps, "weight": weight }))
        .send(app)
        .await
        .assert_status(StatusCode::OK);
}

async fn start_session(app: Router) -> String {
    let body: Value = AxumTestRequest::post("/workouts/sessions/start")
        .json(&json!({ "user_id": "lifter" }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    body["session_id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_generate_returns_parsed_plan() {
    let ctx = create_test_context().await.unwrap();
    ctx.llm.push_text(&workout_plan_json().to_string());
    let app = WorkoutRoutes::routes(ctx.resources.clone());

    let body: Value = AxumTestRequest::post("/workouts/generate")
        .json(&json!({
            "user_id": "gen-user",
            "muscle_groups": ["chest", "shoulders"],
            "workout_type": "strength",
            "duration_minutes": 45
        }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["template"]["title"], "Push Power");
    assert_eq!(body["template"]["exercises"].as_array().unwrap().len(), 3);

    let requests = ctx.llm.requests();
    assert_eq!(requests.len(), 1);
    let user_turn = &requests[0].messages.last().unwrap().content;
    assert!(user_turn.contains("shoulders"));
}

#[tokio::test]
async fn test_generate_keeps_prose_as_raw() {
    let ctx = create_test_context().await.unwrap();
    ctx.llm.push_text("Do some pushups");
    let app = WorkoutRoutes::routes(ctx.resources.clone());

    let body: Value = AxumTestRequest::post("/workouts/generate")
        .json(&json!({ "muscle_groups": ["chest"] }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["template"], json!({ "raw": "Do some pushups" }));
}

#[tokio::test]
async fn test_template_lifecycle() {
    let ctx = create_test_context().await.unwrap();
    let app = WorkoutRoutes::routes(ctx.resources.clone());
    let template_id = create_template(app.clone()).await;

    let detail: Value = AxumTestRequest::get(&format!("/workouts/templates/{template_id}"))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(detail["template"]["title"], "Upper A");
    let exercises = detail["exercises"].as_array().unwrap();
    assert_eq!(exercises.len(), 2);
    assert_eq!(exercises[0]["name"], "Bench Press");
    assert_eq!(exercises[0]["muscle_groups"], json!(["chest"]));
    assert_eq!(exercises[0]["sets"], 4);
    assert_eq!(exercises[1]["name"], "Barbell Row");

    AxumTestRequest::put(&format!("/workouts/templates/{template_id}"))
        .json(&json!({
            "title": "Upper A (deload)",
            "exercises": [{ "name": "Bench Press", "sets": 2, "reps": 6 }]
        }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);

    let copy: Value = AxumTestRequest::post(&format!("/workouts/templates/{template_id}/duplicate"))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    let copy_id = copy["template_id"].as_str().unwrap();
    assert_ne!(copy_id, template_id);

    let copied: Value = AxumTestRequest::get(&format!("/workouts/templates/{copy_id}"))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(copied["template"]["title"], "Upper A (deload) Copy");
    assert_eq!(copied["exercises"].as_array().unwrap().len(), 1);
    assert_eq!(copied["exercises"][0]["sets"], 2);

    let listed: Value = AxumTestRequest::get("/workouts/templates?user_id=lifter")
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(listed["templates"].as_array().unwrap().len(), 2);

    AxumTestRequest::delete(&format!("/workouts/templates/{template_id}"))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);
    AxumTestRequest::get(&format!("/workouts/templates/{template_id}"))
        .send(app.clone())
        .await
        .assert_status(StatusCode::NOT_FOUND);
    AxumTestRequest::delete(&format!("/workouts/templates/{template_id}"))
        .send(app)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_template_requires_user_and_title() {
    let ctx = create_test_context().await.unwrap();
    let app = WorkoutRoutes::routes(ctx.resources.clone());

    AxumTestRequest::post("/workouts/templates")
        .json(&json!({ "title": "Orphan" }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    AxumTestRequest::post("/workouts/templates")
        .json(&json!({ "user_id": "lifter", "title": " " }))
        .send(app)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_completion_records_prs_once() {
    let ctx = create_test_context().await.unwrap();
    let app = WorkoutRoutes::routes(ctx.resources.clone());

    let first = start_session(app.clone()).await;
    log_set(app.clone(), &first, "Bench Press", 5, 100.0).await;
    log_set(app.clone(), &first, "Bench Press", 8, 80.0).await;
    log_set(app.clone(), &first, "Plank", 0, 0.0).await;

    let completed: Value = AxumTestRequest::post(&format!("/workouts/sessions/{first}/complete"))
        .json(&json!({ "duration_seconds": 3600 }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(completed["status"], "completed");
    assert_eq!(completed["duration_seconds"], 3600);
    let prs = completed["prs"].as_array().unwrap();
    assert_eq!(prs.len(), 1);
    assert_eq!(prs[0]["exercise_name"], "Bench Press");
    assert_eq!(prs[0]["value"], 116.67);
    assert!(prs[0]["previous_value"].is_null());

    // Same estimate again is not a new record
    let second = start_session(app.clone()).await;
    log_set(app.clone(), &second, "Bench Press", 5, 100.0).await;
    let repeat: Value = AxumTestRequest::post(&format!("/workouts/sessions/{second}/complete"))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert!(repeat["prs"].as_array().unwrap().is_empty());

    let third = start_session(app.clone()).await;
    log_set(app.clone(), &third, "Bench Press", 3, 110.0).await;
    let improved: Value = AxumTestRequest::post(&format!("/workouts/sessions/{third}/complete"))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(improved["prs"][0]["value"], 121.0);
    assert_eq!(improved["prs"][0]["previous_value"], 116.67);
}

#[tokio::test]
async fn test_logging_to_unknown_session_fails() {
    let ctx = create_test_context().await.unwrap();
    let app = WorkoutRoutes::routes(ctx.resources.clone());

    AxumTestRequest::post("/workouts/sessions/missing/log")
        .json(&json!({ "exercise_name": "Squat", "reps": 5, "weight": 100 }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::NOT_FOUND);
    AxumTestRequest::post("/workouts/sessions/missing/complete")
        .send(app)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_exercise_history_best_set() {
    let ctx = create_test_context().await.unwrap();
    let app = WorkoutRoutes::routes(ctx.resources.clone());

    let session = start_session(app.clone()).await;
    log_set(app.clone(), &session, "Squat", 5, 140.0).await;
    log_set(app.clone(), &session, "Squat", 10, 100.0).await;
    log_set(app.clone(), &session, "Deadlift", 3, 200.0).await;

    let logs: Value = AxumTestRequest::get(&format!("/workouts/sessions/{session}/logs"))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(logs["logs"].as_array().unwrap().len(), 3);

    let history: Value =
        AxumTestRequest::get("/workouts/exercises/history?user_id=lifter&exercise_name=Squat")
            .send(app)
            .await
            .assert_status(StatusCode::OK)
            .json();
    assert_eq!(history["exercise_name"], "Squat");
    assert_eq!(history["entries"].as_array().unwrap().len(), 2);
    assert_eq!(history["trend"].as_array().unwrap().len(), 2);
    assert_eq!(history["best_set"]["weight"], 140.0);
    assert_eq!(history["estimated_1rm"], 163.33);
}
