// ABOUTME: Profile database operations including onboarding audit rows and coach interest
// ABOUTME: Upserts only overwrite fields that were provided, leaving the rest untouched
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::Result;
use fitai_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::{json_column, json_text, now_timestamp, Database};

impl Database {
    /// Create profile, onboarding and coach interest tables
    ///
    /// # Errors
    ///
    /// Returns an error if table creation fails
    pub(super) async fn migrate_profiles(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                full_name TEXT,
                age INTEGER,
                sex TEXT,
                height_cm REAL,
                weight_kg REAL,
                goal TEXT,
                macros TEXT,
                preferences TEXT,
                units TEXT,
                subscription_status TEXT,
                tutorial_completed INTEGER NOT NULL DEFAULT 0,
                tutorial_completed_at TEXT,
                check_in_day TEXT,
                photos_pending INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS onboarding_states (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                step_index INTEGER NOT NULL,
                data TEXT NOT NULL,
                is_complete INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS coach_interest (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                interest_enum TEXT NOT NULL CHECK (interest_enum IN ('coach', 'hire')),
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Stored profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Owning user
    pub user_id: String,
    /// Display name
    pub full_name: Option<String>,
    /// Age in years
    pub age: Option<i64>,
    /// Sex as reported
    pub sex: Option<String>,
    /// Height in centimetres
    pub height_cm: Option<f64>,
    /// Weight in kilograms
    pub weight_kg: Option<f64>,
    /// Training goal
    pub goal: Option<String>,
    /// Macro targets; values may be numbers or numeric strings
    pub macros: Value,
    /// Free-form preferences object
    pub preferences: Value,
    /// Preferred unit system
    pub units: Option<String>,
    /// Billing state
    pub subscription_status: Option<String>,
    /// Finished the in-app tutorial
    pub tutorial_completed: bool,
    /// When the tutorial was finished
    pub tutorial_completed_at: Option<String>,
    /// Preferred weekly check-in day
    pub check_in_day: Option<String>,
    /// Onboarding photos still to upload
    pub photos_pending: Option<bool>,
    /// Creation time
    pub created_at: String,
    /// Last update time
    pub updated_at: String,
}

impl ProfileRecord {
    fn from_row(r: &SqliteRow) -> Self {
        Self {
            user_id: r.get("user_id"),
            full_name: r.get("full_name"),
            age: r.get("age"),
            sex: r.get("sex"),
            height_cm: r.get("height_cm"),
            weight_kg: r.get("weight_kg"),
            goal: r.get("goal"),
            macros: json_column(r, "macros"),
            preferences: json_column(r, "preferences"),
            units: r.get("units"),
            subscription_status: r.get("subscription_status"),
            tutorial_completed: r.get::<i64, _>("tutorial_completed") != 0,
            tutorial_completed_at: r.get("tutorial_completed_at"),
            check_in_day: r.get("check_in_day"),
            photos_pending: r.get::<Option<i64>, _>("photos_pending").map(|v| v != 0),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

/// Partial profile update; `None` fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// Display name
    pub full_name: Option<String>,
    /// Age in years
    pub age: Option<i64>,
    /// Sex as reported
    pub sex: Option<String>,
    /// Height in centimetres
    pub height_cm: Option<f64>,
    /// Weight in kilograms
    pub weight_kg: Option<f64>,
    /// Training goal
    pub goal: Option<String>,
    /// Macro targets
    pub macros: Option<Value>,
    /// Preferences object (replaces the stored one)
    pub preferences: Option<Value>,
    /// Preferred unit system
    pub units: Option<String>,
    /// Billing state
    pub subscription_status: Option<String>,
    /// Onboarding photos still to upload
    pub photos_pending: Option<bool>,
}

const PROFILE_COLUMNS: &str = "user_id, full_name, age, sex, height_cm, weight_kg, goal, macros, \
    preferences, units, subscription_status, tutorial_completed, tutorial_completed_at, \
    check_in_day, photos_pending, created_at, updated_at";

/// Profile database operations
pub struct ProfileManager {
    pool: SqlitePool,
}

impl ProfileManager {
    /// Create a new profile manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch a profile
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get(&self, user_id: &str) -> AppResult<Option<ProfileRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get profile: {e}")))?;

        Ok(row.as_ref().map(ProfileRecord::from_row))
    }

    /// Insert or partially update a profile and return the stored row
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails
    pub async fn upsert(&self, user_id: &str, update: &ProfileUpdate) -> AppResult<ProfileRecord> {
        let now = now_timestamp();
        sqlx::query(
            r"
            INSERT INTO profiles (user_id, full_name, age, sex, height_cm, weight_kg, goal, macros,
                                  preferences, units, subscription_status, photos_pending,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            ON CONFLICT(user_id) DO UPDATE SET
                full_name = COALESCE(excluded.full_name, profiles.full_name),
                age = COALESCE(excluded.age, profiles.age),
                sex = COALESCE(excluded.sex, profiles.sex),
                height_cm = COALESCE(excluded.height_cm, profiles.height_cm),
                weight_kg = COALESCE(excluded.weight_kg, profiles.weight_kg),
                goal = COALESCE(excluded.goal, profiles.goal),
                macros = COALESCE(excluded.macros, profiles.macros),
                preferences = COALESCE(excluded.preferences, profiles.preferences),
                units = COALESCE(excluded.units, profiles.units),
                subscription_status = COALESCE(excluded.subscription_status, profiles.subscription_status),
                photos_pending = COALESCE(excluded.photos_pending, profiles.photos_pending),
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id)
        .bind(&update.full_name)
        .bind(update.age)
        .bind(&update.sex)
        .bind(update.height_cm)
        .bind(update.weight_kg)
        .bind(&update.goal)
        .bind(update.macros.as_ref().and_then(json_text))
        .bind(update.preferences.as_ref().and_then(json_text))
        .bind(&update.units)
        .bind(&update.subscription_status)
        .bind(update.photos_pending)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to upsert profile: {e}")))?;

        self.get(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile"))
    }

    /// Replace the macro targets
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails
    pub async fn set_macros(&self, user_id: &str, macros: &Value) -> AppResult<ProfileRecord> {
        self.upsert(
            user_id,
            &ProfileUpdate {
                macros: Some(macros.clone()),
                ..ProfileUpdate::default()
            },
        )
        .await
    }

    /// Merge keys into the preferences object
    ///
    /// # Errors
    ///
    /// Returns an error if the database read or write fails
    pub async fn merge_preferences(
        &self,
        user_id: &str,
        patch: Map<String, Value>,
    ) -> AppResult<ProfileRecord> {
        let mut preferences = self
            .get(user_id)
            .await?
            .and_then(|p| p.preferences.as_object().cloned())
            .unwrap_or_default();
        preferences.extend(patch);

        self.upsert(
            user_id,
            &ProfileUpdate {
                preferences: Some(Value::Object(preferences)),
                ..ProfileUpdate::default()
            },
        )
        .await
    }

    /// Record tutorial completion
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails
    pub async fn set_tutorial_completed(
        &self,
        user_id: &str,
        completed: bool,
    ) -> AppResult<ProfileRecord> {
        let now = now_timestamp();
        let completed_at = completed.then(|| now.clone());
        sqlx::query(
            r"
            INSERT INTO profiles (user_id, tutorial_completed, tutorial_completed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT(user_id) DO UPDATE SET
                tutorial_completed = excluded.tutorial_completed,
                tutorial_completed_at = excluded.tutorial_completed_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id)
        .bind(completed)
        .bind(completed_at)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update tutorial state: {e}")))?;

        self.get(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile"))
    }

    /// Set the preferred weekly check-in day
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails
    pub async fn set_check_in_day(&self, user_id: &str, day: &str) -> AppResult<ProfileRecord> {
        let now = now_timestamp();
        sqlx::query(
            r"
            INSERT INTO profiles (user_id, check_in_day, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT(user_id) DO UPDATE SET
                check_in_day = excluded.check_in_day,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id)
        .bind(day)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update check-in day: {e}")))?;

        self.get(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile"))
    }

    /// Record an onboarding audit row
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn record_onboarding_state(
        &self,
        user_id: &str,
        step_index: i64,
        data: &Value,
        is_complete: bool,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO onboarding_states (id, user_id, step_index, data, is_complete, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(step_index)
        .bind(data.to_string())
        .bind(is_complete)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record onboarding state: {e}")))?;
        Ok(())
    }

    /// Record interest in the coach marketplace (`coach` or `hire`)
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn record_coach_interest(&self, user_id: &str, interest: &str) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO coach_interest (id, user_id, interest_enum, created_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(interest)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record coach interest: {e}")))?;
        Ok(())
    }

    /// Count onboarding rows for a user
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn count_onboarding_states(&self, user_id: &str) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM onboarding_states WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count onboarding states: {e}")))
    }
}
