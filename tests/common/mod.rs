// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides in-memory databases, scripted LLM wiring and temp-dir photo storage
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `fitai_server`
//!
//! Test files declare `mod common; mod helpers;` and build a
//! [`TestContext`] per test. Each context owns its own in-memory database
//! and upload directory.

use std::sync::{Arc, Once};

use anyhow::Result;
use axum::Router;
use fitai_server::{
    config::{DatabaseUrl, ServerConfig},
    database::Database,
    resources::ServerResources,
    server,
    storage::LocalBlobStore,
};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::helpers::mock_llm::ScriptedLlm;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Migrated in-memory database
pub async fn create_test_database() -> Result<Database> {
    init_test_logging();
    let database = Database::new(&DatabaseUrl::Memory).await?;
    database.migrate().await?;
    Ok(database)
}

/// Everything a route test needs
pub struct TestContext {
    pub resources: Arc<ServerResources>,
    pub llm: Arc<ScriptedLlm>,
    pub uploads: TempDir,
}

impl TestContext {
    /// Database handle shared with the routes
    pub fn database(&self) -> &Database {
        &self.resources.database
    }

    /// Full application including middleware
    pub fn app(&self) -> Router {
        server::build_router(&self.resources)
    }
}

/// Resources backed by an in-memory database, a scripted LLM and a temp upload dir
pub async fn create_test_context() -> Result<TestContext> {
    create_test_context_with(|_| {}).await
}

/// Same as [`create_test_context`] with a config tweak applied first
pub async fn create_test_context_with(tweak: impl FnOnce(&mut ServerConfig)) -> Result<TestContext> {
    let database = create_test_database().await?;
    let uploads = TempDir::new()?;

    let mut config = ServerConfig::default();
    config.database.url = DatabaseUrl::Memory;
    config.storage.local_dir = uploads.path().to_path_buf();
    config.storage.public_base_url = "http://localhost:8000/uploads".to_owned();
    tweak(&mut config);

    let blob_store = Arc::new(LocalBlobStore::new(
        config.storage.local_dir.clone(),
        config.storage.public_base_url.clone(),
    ));
    let llm = Arc::new(ScriptedLlm::new());
    let resources = ServerResources::new(Arc::new(config), database, llm.clone(), blob_store);

    Ok(TestContext {
        resources: Arc::new(resources),
        llm,
        uploads,
    })
}

/// A typical profile with macro targets, stored through the profile manager
pub async fn seed_profile(database: &Database, user_id: &str) -> Result<()> {
    use fitai_server::database::ProfileUpdate;

    database.users().ensure_exists(user_id).await?;
    database
        .profiles()
        .upsert(
            user_id,
            &ProfileUpdate {
                full_name: Some("Test Athlete".to_owned()),
                age: Some(30),
                height_cm: Some(180.0),
                weight_kg: Some(80.0),
                goal: Some("build_muscle".to_owned()),
                macros: Some(json!({
                    "calories": 2500,
                    "protein": 180,
                    "carbs": 250,
                    "fats": 80
                })),
                preferences: Some(json!({ "training_days": 4, "gender": "male" })),
                ..ProfileUpdate::default()
            },
        )
        .await?;
    Ok(())
}

/// JSON the workout prompt would return for a short plan
pub fn workout_plan_json() -> Value {
    json!({
        "title": "Push Power",
        "exercises": [
            { "name": "Bench Press", "sets": 4, "reps": "8-10", "rest_seconds": 90 },
            { "name": "Overhead Press", "sets": 3, "reps": 10 },
            { "name": "Cable Fly" }
        ]
    })
}
