// ABOUTME: User authentication route handlers for registration and login
// ABOUTME: bcrypt password storage with transparent upgrade of legacy SHA-256 hashes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Authentication routes
//!
//! Accounts are identified by email. Sessions are not issued; the client
//! keeps the returned `user_id` and sends it with later requests. Hashes
//! written by older deployments are unsalted SHA-256 hex; a successful login
//! with one of those replaces it with a bcrypt hash.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use fitai_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::Database;
use crate::logging::AppLogger;
use crate::resources::ServerResources;

/// Registration or login request
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Registration or login response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub status: &'static str,
    pub user_id: String,
}

/// How a stored hash matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PasswordMatch {
    Bcrypt,
    Legacy,
    Mismatch,
}

fn legacy_hash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn is_bcrypt_hash(hash: &str) -> bool {
    hash.starts_with("$2")
}

/// Authentication service for business logic
#[derive(Clone)]
pub struct AuthService {
    database: Database,
}

impl AuthService {
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    fn validate(request: &CredentialsRequest) -> AppResult<()> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(AppError::invalid_input("Email and password are required"));
        }
        Ok(())
    }

    async fn hash_password(password: String) -> AppResult<String> {
        tokio::task::spawn_blocking(move || bcrypt::hash(&password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Password hashing error: {e}")))
    }

    async fn verify_password(password: String, stored: String) -> AppResult<PasswordMatch> {
        if is_bcrypt_hash(&stored) {
            let valid = tokio::task::spawn_blocking(move || bcrypt::verify(&password, &stored))
                .await
                .map_err(|e| {
                    AppError::internal(format!("Password verification task failed: {e}"))
                })?
                .map_err(|e| AppError::internal(format!("Password verification error: {e}")))?;
            return Ok(if valid {
                PasswordMatch::Bcrypt
            } else {
                PasswordMatch::Mismatch
            });
        }

        Ok(if legacy_hash(&password).eq_ignore_ascii_case(&stored) {
            PasswordMatch::Legacy
        } else {
            PasswordMatch::Mismatch
        })
    }

    /// Create an account
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for empty credentials and `ResourceAlreadyExists`
    /// for a taken email
    pub async fn register(&self, request: CredentialsRequest) -> AppResult<AuthResponse> {
        Self::validate(&request)?;
        let email = request.email.trim().to_owned();
        let users = self.database.users();

        if users.find_by_email(&email).await?.is_some() {
            return Err(AppError::already_exists("Email already registered"));
        }

        let password_hash = Self::hash_password(request.password).await?;
        let user_id = Uuid::new_v4().to_string();
        users.create(&user_id, &email, &password_hash).await?;

        AppLogger::log_auth_event(&user_id, "register", true);
        info!(user_id = %user_id, "User registered");
        Ok(AuthResponse {
            status: "ok",
            user_id,
        })
    }

    /// Check credentials
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` for an unknown email or a wrong password
    pub async fn login(&self, request: CredentialsRequest) -> AppResult<AuthResponse> {
        Self::validate(&request)?;
        let users = self.database.users();

        let Some(user) = users.find_by_email(request.email.trim()).await? else {
            AppLogger::log_auth_event("unknown", "login", false);
            return Err(AppError::auth_invalid("Invalid credentials"));
        };

        let password = request.password;
        match Self::verify_password(password.clone(), user.password_hash.clone()).await? {
            PasswordMatch::Mismatch => {
                AppLogger::log_auth_event(&user.id, "login", false);
                return Err(AppError::auth_invalid("Invalid credentials"));
            }
            PasswordMatch::Legacy => {
                let upgraded = Self::hash_password(password).await?;
                if let Err(e) = users.update_password_hash(&user.id, &upgraded).await {
                    warn!(user_id = %user.id, error = %e.message, "Failed to upgrade legacy password hash");
                } else {
                    info!(user_id = %user.id, "Upgraded legacy password hash");
                }
            }
            PasswordMatch::Bcrypt => {}
        }

        AppLogger::log_auth_event(&user.id, "login", true);
        Ok(AuthResponse {
            status: "ok",
            user_id: user.id,
        })
    }
}

/// Authentication routes
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all authentication routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/auth/register", post(Self::handle_register))
            .route("/auth/login", post(Self::handle_login))
            .with_state(resources)
    }

    async fn handle_register(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<CredentialsRequest>,
    ) -> Result<Response, AppError> {
        let response = AuthService::new(resources.database.clone())
            .register(request)
            .await?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<CredentialsRequest>,
    ) -> Result<Response, AppError> {
        let response = AuthService::new(resources.database.clone())
            .login(request)
            .await?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }
}
