// ABOUTME: User account database operations
// ABOUTME: Registration lookups, password hash upgrades, and placeholder users for client-generated ids
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::Result;
use fitai_core::constants::users::{DEFAULT_ROLE, PLACEHOLDER_PASSWORD_HASH};
use fitai_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::{now_timestamp, Database};

impl Database {
    /// Create the users table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_users(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Stored user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// User id (UUID string)
    pub id: String,
    /// Login email
    pub email: String,
    /// bcrypt hash, legacy SHA-256 hex, or the placeholder marker
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Role name
    pub role: String,
    /// Creation time
    pub created_at: String,
}

/// User account operations
pub struct UserManager {
    pool: SqlitePool,
}

impl UserManager {
    /// Create a new user manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up a user by email
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, role, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to look up user: {e}")))?;

        Ok(row.map(|r| UserRecord {
            id: r.get("id"),
            email: r.get("email"),
            password_hash: r.get("password_hash"),
            role: r.get("role"),
            created_at: r.get("created_at"),
        }))
    }

    /// Insert a user with an already-hashed password
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` when the email is taken
    pub async fn create(&self, id: &str, email: &str, password_hash: &str) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO users (id, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .bind(DEFAULT_ROLE)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::already_exists("Email already registered")
            } else {
                AppError::database(format!("Failed to create user: {e}"))
            }
        })?;
        Ok(())
    }

    /// Replace a user's password hash
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails
    pub async fn update_password_hash(&self, id: &str, password_hash: &str) -> AppResult<()> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update password: {e}")))?;
        Ok(())
    }

    /// Create a placeholder user row when the id is unknown
    ///
    /// Clients may generate their own ids before registering; rows keyed by
    /// those ids still need an owning user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn ensure_exists(&self, id: &str) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT OR IGNORE INTO users (id, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(id)
        .bind(format!("user-{id}@placeholder.local"))
        .bind(PLACEHOLDER_PASSWORD_HASH)
        .bind(DEFAULT_ROLE)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to ensure user: {e}")))?;
        Ok(())
    }
}
