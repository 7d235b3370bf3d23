// ABOUTME: Coach marketplace profile storage
// ABOUTME: One profile per user, upserted in place
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::Result;
use fitai_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::{json_column, json_text, now_timestamp, Database};

impl Database {
    /// Create the coach profile table
    ///
    /// # Errors
    ///
    /// Returns an error if table creation fails
    pub(super) async fn migrate_coach(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS coach_profiles (
                user_id TEXT PRIMARY KEY,
                bio TEXT,
                specialties TEXT NOT NULL DEFAULT '[]',
                pricing TEXT,
                availability TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Public coach profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachProfileRecord {
    pub user_id: String,
    pub bio: Option<String>,
    pub specialties: Vec<String>,
    pub pricing: Value,
    pub availability: Value,
    pub created_at: String,
    pub updated_at: String,
}

impl CoachProfileRecord {
    fn from_row(r: &SqliteRow) -> Self {
        let specialties = r
            .get::<Option<String>, _>("specialties")
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self {
            user_id: r.get("user_id"),
            bio: r.get("bio"),
            specialties,
            pricing: json_column(r, "pricing"),
            availability: json_column(r, "availability"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

/// Profile fields accepted on upsert
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoachProfileUpsert {
    pub user_id: String,
    pub bio: Option<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    pub pricing: Option<Value>,
    pub availability: Option<Value>,
}

const COLUMNS: &str = "user_id, bio, specialties, pricing, availability, created_at, updated_at";

/// Coach profile operations
pub struct CoachManager {
    pool: SqlitePool,
}

impl CoachManager {
    /// Create a new coach manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace a coach profile
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database write fails
    pub async fn upsert(&self, profile: &CoachProfileUpsert) -> AppResult<CoachProfileRecord> {
        let now = now_timestamp();
        sqlx::query(
            r"
            INSERT INTO coach_profiles (user_id, bio, specialties, pricing, availability, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT(user_id) DO UPDATE SET
                bio = excluded.bio,
                specialties = excluded.specialties,
                pricing = excluded.pricing,
                availability = excluded.availability,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&profile.user_id)
        .bind(&profile.bio)
        .bind(serde_json::to_string(&profile.specialties)?)
        .bind(profile.pricing.as_ref().and_then(json_text))
        .bind(profile.availability.as_ref().and_then(json_text))
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save coach profile: {e}")))?;

        self.get(&profile.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Coach profile"))
    }

    /// Fetch a coach profile
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get(&self, user_id: &str) -> AppResult<Option<CoachProfileRecord>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM coach_profiles WHERE user_id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get coach profile: {e}")))?;

        Ok(row.as_ref().map(CoachProfileRecord::from_row))
    }

    /// Most recently updated coach profiles
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn discover(&self, limit: i64) -> AppResult<Vec<CoachProfileRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM coach_profiles ORDER BY updated_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list coach profiles: {e}")))?;

        Ok(rows.iter().map(CoachProfileRecord::from_row).collect())
    }
}
