// ABOUTME: Integration tests for coach chat threads, replies, proposals and streaming
// ABOUTME: Drives the chat routes with a scripted LLM and inspects stored messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use axum::Router;
use common::{create_test_context, seed_profile, workout_plan_json};
use fitai_core::constants::chat::{
    GENERIC_REFUSAL, MACROS_APPLIED, PROPOSAL_DECLINED, WORKOUT_CREATED, WORKOUT_PENDING,
};
use fitai_server::routes::ChatRoutes;
use fitai_server::services::identity::normalize_user_id;
use helpers::axum_test::AxumTestRequest;
use serde_json::{json, Value};

async fn create_thread(app: Router, user: &str) -> String {
    let body: Value = AxumTestRequest::post("/chat/thread")
        .json(&json!({ "user_id": user, "title": "Coaching" }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    body["thread"]["id"].as_str().unwrap().to_owned()
}

async fn send(app: Router, user: &str, thread_id: &str, content: &str) -> Value {
    AxumTestRequest::post("/chat/message")
        .json(&json!({
            "user_id": user,
            "thread_id": thread_id,
            "content": content,
            "stream": false
        }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json()
}

#[tokio::test]
async fn test_thread_create_list_and_fetch() {
    let ctx = create_test_context().await.unwrap();
    let app = ChatRoutes::routes(ctx.resources.clone());
    let thread_id = create_thread(app.clone(), "chatter").await;

    let listed: Value = AxumTestRequest::get("/chat/threads?user_id=chatter")
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(listed["threads"][0]["id"], thread_id.as_str());

    let fetched: Value = AxumTestRequest::get(&format!("/chat/thread/{thread_id}?user_id=chatter"))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(fetched["thread"]["title"], "Coaching");
    assert!(fetched["messages"].as_array().unwrap().is_empty());

    AxumTestRequest::get(&format!("/chat/thread/{thread_id}?user_id=someone-else"))
        .send(app)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reply_is_shaped_and_stored() {
    let ctx = create_test_context().await.unwrap();
    ctx.llm.push_text(
        "**Great question!** Keep protein high today. Sleep at least eight hours. Drink water too.",
    );
    let app = ChatRoutes::routes(ctx.resources.clone());
    let thread_id = create_thread(app.clone(), "chatter").await;

    let body = send(app.clone(), "chatter", &thread_id, "How do I recover faster?").await;
    assert_eq!(body["reply"], "Great question! Keep protein high today.");
    assert!(body.get("workout_created").is_none());

    let request = &ctx.llm.requests()[0];
    assert_eq!(request.tools.len(), 2);
    assert!(request.messages[1].content.starts_with("User Context"));
    assert_eq!(
        request.messages.last().unwrap().content,
        "How do I recover faster?"
    );

    let messages = ctx.database().chat().list_messages(&thread_id).await.unwrap();
    assert_eq!(messages.len(), 2);
    let assistant = messages.iter().find(|m| m.role == "assistant").unwrap();
    assert_eq!(assistant.content, "Great question! Keep protein high today.");
    assert_eq!(assistant.model.as_deref(), Some("scripted-model"));
}

#[tokio::test]
async fn test_flagged_message_is_refused_without_model_call() {
    let ctx = create_test_context().await.unwrap();
    ctx.llm.flag_moderation(&["harassment"]);
    let app = ChatRoutes::routes(ctx.resources.clone());
    let thread_id = create_thread(app.clone(), "chatter").await;

    let body = send(app, "chatter", &thread_id, "something nasty").await;
    assert_eq!(body["reply"], GENERIC_REFUSAL);
    assert_eq!(ctx.llm.call_count(), 0);

    let messages = ctx.database().chat().list_messages(&thread_id).await.unwrap();
    let refusal = messages.iter().find(|m| m.role == "assistant").unwrap();
    assert_eq!(refusal.safety_flags, json!(["harassment"]));
}

#[tokio::test]
async fn test_macro_proposal_confirmed() {
    let ctx = create_test_context().await.unwrap();
    seed_profile(ctx.database(), &normalize_user_id("chatter"))
        .await
        .unwrap();
    ctx.llm.push_tool_call(
        "propose_app_action",
        json!({ "action_type": "update_macros", "summary": "Raise protein to 200g", "protein": 200 }),
    );
    let app = ChatRoutes::routes(ctx.resources.clone());
    let thread_id = create_thread(app.clone(), "chatter").await;

    let proposed = send(app.clone(), "chatter", &thread_id, "Should I eat more protein?").await;
    assert_eq!(proposed["reply"], "Raise protein to 200g. Want me to apply it?");
    assert_eq!(proposed["proposed_action"]["status"], "pending");

    let confirmed = send(app, "chatter", &thread_id, "Yes!").await;
    assert_eq!(confirmed["reply"], MACROS_APPLIED);
    assert_eq!(confirmed["proposed_action"]["status"], "applied");
    assert_eq!(ctx.llm.call_count(), 1);

    let profile = ctx
        .database()
        .profiles()
        .get(&normalize_user_id("chatter"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.macros["protein"], 200.0);
    assert_eq!(profile.macros["calories"], 2500.0);
}

#[tokio::test]
async fn test_macro_proposal_declined() {
    let ctx = create_test_context().await.unwrap();
    seed_profile(ctx.database(), &normalize_user_id("chatter"))
        .await
        .unwrap();
    ctx.llm.push_tool_call(
        "propose_app_action",
        json!({ "action_type": "update_macros", "summary": "Drop calories to 2000", "calories": 2000 }),
    );
    let app = ChatRoutes::routes(ctx.resources.clone());
    let thread_id = create_thread(app.clone(), "chatter").await;

    send(app.clone(), "chatter", &thread_id, "Am I eating too much?").await;
    let declined = send(app, "chatter", &thread_id, "no thanks").await;
    assert_eq!(declined["reply"], PROPOSAL_DECLINED);

    let profile = ctx
        .database()
        .profiles()
        .get(&normalize_user_id("chatter"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.macros["calories"], 2500);
}

#[tokio::test]
async fn test_workout_request_streams_pending_then_outcome() {
    let ctx = create_test_context().await.unwrap();
    ctx.llm.push_text(&workout_plan_json().to_string());
    let app = ChatRoutes::routes(ctx.resources.clone());
    let thread_id = create_thread(app.clone(), "chatter").await;

    let response = AxumTestRequest::post("/chat/message")
        .json(&json!({
            "user_id": "chatter",
            "thread_id": thread_id,
            "content": "Build me a chest workout for 45 minutes"
        }))
        .send_sse(app)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.events,
        vec![
            WORKOUT_PENDING.to_owned(),
            format!(" {WORKOUT_CREATED}"),
            "[DONE]".to_owned(),
        ]
    );

    let user_id = normalize_user_id("chatter");
    let templates = ctx
        .database()
        .workouts()
        .list_templates(&user_id, None)
        .await
        .unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].title, "Coaches Pick: Push Power");
    assert_eq!(templates[0].mode, "coach");

    let messages = ctx.database().chat().list_messages(&thread_id).await.unwrap();
    let assistant = messages.iter().find(|m| m.role == "assistant").unwrap();
    assert_eq!(assistant.content, format!("{WORKOUT_PENDING} {WORKOUT_CREATED}"));
    assert_eq!(assistant.metadata["workout_created"]["exercise_count"], 3);
}

#[tokio::test]
async fn test_plain_reply_streams_single_event() {
    let ctx = create_test_context().await.unwrap();
    ctx.llm.push_text("Rest days count too.");
    let app = ChatRoutes::routes(ctx.resources.clone());
    let thread_id = create_thread(app.clone(), "chatter").await;

    let response = AxumTestRequest::post("/chat/message")
        .json(&json!({ "user_id": "chatter", "thread_id": thread_id, "content": "Can I rest today?" }))
        .send_sse(app)
        .await;
    assert_eq!(
        response.events,
        vec!["Rest days count too.".to_owned(), "[DONE]".to_owned()]
    );
}

#[tokio::test]
async fn test_message_validation() {
    let ctx = create_test_context().await.unwrap();
    let app = ChatRoutes::routes(ctx.resources.clone());
    let thread_id = create_thread(app.clone(), "owner").await;

    let empty: Value = AxumTestRequest::post("/chat/message")
        .json(&json!({ "user_id": "owner", "thread_id": thread_id, "content": "   ", "stream": false }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::BAD_REQUEST)
        .json();
    assert_eq!(empty["error"]["message"], "Message content required");

    AxumTestRequest::post("/chat/message")
        .json(&json!({ "user_id": "intruder", "thread_id": thread_id, "content": "hi", "stream": false }))
        .send(app)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    assert_eq!(ctx.llm.call_count(), 0);
}
