// ABOUTME: Main library entry point for the FitAI backend
// ABOUTME: HTTP/JSON API for onboarding, workouts, nutrition, check-ins and an AI chat coach
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![recursion_limit = "256"]
#![deny(unsafe_code)]

//! # FitAI Server
//!
//! Backend for a fitness coaching app. Clients identify users by id; the
//! server stores profiles, workouts, meal logs and check-ins in SQLite and
//! calls an OpenAI-compatible model for workout generation, meal photo
//! parsing, weekly macro adjustments and the chat coach.
//!
//! ## Architecture
//!
//! - **Routes**: thin axum handlers, one router per domain
//! - **Services**: business rules shared by several routes
//! - **Database**: per-domain managers over a `sqlx` pool
//! - **LLM / External / Storage**: traits and clients for the model, food
//!   databases and photo storage
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use fitai_server::config::ServerConfig;
//! use fitai_server::database::Database;
//! use fitai_server::resources::ServerResources;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let database = Database::new(&config.database.url).await?;
//!     database.migrate().await?;
//!
//!     let resources = ServerResources::from_config(Arc::new(config), database)?;
//!     fitai_server::server::serve(Arc::new(resources)).await
//! }
//! ```

/// Environment-driven configuration
pub mod config;

/// `SQLite` persistence and per-domain managers
pub mod database;

/// USDA and `FatSecret` food database clients
pub mod external;

/// Chat completion and moderation provider
pub mod llm;

/// Structured logging setup and domain event helpers
pub mod logging;

/// HTTP middleware: CORS and request tracing
pub mod middleware;

/// Shared handler dependencies
pub mod resources;

/// HTTP route handlers
pub mod routes;

/// Router assembly and the serve loop
pub mod server;

/// Business logic shared across routes
pub mod services;

/// Photo blob storage
pub mod storage;

pub use fitai_core::errors;
