// ABOUTME: Integration tests for registration and login
// ABOUTME: Covers duplicate emails, bad credentials and legacy hash upgrades
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use common::create_test_context;
use fitai_server::routes::AuthRoutes;
use helpers::axum_test::AxumTestRequest;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

#[tokio::test]
async fn test_register_then_login() {
    let ctx = create_test_context().await.unwrap();
    let app = AuthRoutes::routes(ctx.resources.clone());

    let registered: Value = AxumTestRequest::post("/auth/register")
        .json(&json!({ "email": "lifter@example.com", "password": "s3cret-pass" }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(registered["status"], "ok");
    let user_id = registered["user_id"].as_str().unwrap().to_owned();

    let stored = ctx
        .database()
        .users()
        .find_by_email("lifter@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.password_hash.starts_with("$2"));

    let logged_in: Value = AxumTestRequest::post("/auth/login")
        .json(&json!({ "email": "lifter@example.com", "password": "s3cret-pass" }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(logged_in["user_id"], user_id.as_str());
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let ctx = create_test_context().await.unwrap();
    let app = AuthRoutes::routes(ctx.resources.clone());
    let body = json!({ "email": "dup@example.com", "password": "pw" });

    AxumTestRequest::post("/auth/register")
        .json(&body)
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);
    let conflict: Value = AxumTestRequest::post("/auth/register")
        .json(&body)
        .send(app)
        .await
        .assert_status(StatusCode::CONFLICT)
        .json();
    assert_eq!(conflict["error"]["message"], "Email already registered");
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_are_unauthorized() {
    let ctx = create_test_context().await.unwrap();
    let app = AuthRoutes::routes(ctx.resources.clone());

    AxumTestRequest::post("/auth/register")
        .json(&json!({ "email": "a@example.com", "password": "right" }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);

    AxumTestRequest::post("/auth/login")
        .json(&json!({ "email": "a@example.com", "password": "wrong" }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    AxumTestRequest::post("/auth/login")
        .json(&json!({ "email": "nobody@example.com", "password": "right" }))
        .send(app)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_credentials_rejected() {
    let ctx = create_test_context().await.unwrap();
    AxumTestRequest::post("/auth/register")
        .json(&json!({ "email": " ", "password": "" }))
        .send(AuthRoutes::routes(ctx.resources.clone()))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_legacy_hash_is_upgraded_on_login() {
    let ctx = create_test_context().await.unwrap();
    let legacy = hex::encode(Sha256::digest(b"old-password"));
    ctx.database()
        .users()
        .create("legacy-user", "legacy@example.com", &legacy)
        .await
        .unwrap();

    AxumTestRequest::post("/auth/login")
        .json(&json!({ "email": "legacy@example.com", "password": "old-password" }))
        .send(AuthRoutes::routes(ctx.resources.clone()))
        .await
        .assert_status(StatusCode::OK);

    let stored = ctx
        .database()
        .users()
        .find_by_email("legacy@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.password_hash.starts_with("$2"));
}
