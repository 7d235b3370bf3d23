// ABOUTME: Database connection management, schema migration, and per-domain managers
// ABOUTME: SQLite via sqlx; JSON columns stored as TEXT and timestamps as RFC 3339 strings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Database Management
//!
//! `Database` owns the connection pool and runs migrations. Each domain
//! gets a small manager (`UserManager`, `WorkoutManager`, ...) that holds a
//! clone of the pool, so handlers can create them on demand.

mod ai;
mod chat;
mod checkins;
mod coach;
mod exercises;
mod nutrition;
mod payments;
mod profiles;
mod progress;
mod users;
mod workouts;

pub use ai::{AiJobRecord, AiManager, AiPromptRecord};
pub use chat::{ChatManager, ChatMessageRecord, ChatThreadRecord, NewChatMessage};
pub use checkins::{CheckinManager, DailyCheckinRecord, NewWeeklyCheckin, WeeklyCheckinRecord};
pub use coach::{CoachManager, CoachProfileRecord, CoachProfileUpsert};
pub use exercises::{ExerciseManager, ExerciseRecord};
pub use nutrition::{
    FavoriteRecord, FoodItemRecord, NewNutritionLog, NutritionLogRecord, NutritionManager,
};
pub use payments::{NewPaymentRecord, PaymentManager, PaymentRecord};
pub use profiles::{ProfileManager, ProfileRecord, ProfileUpdate};
pub use progress::{NewProgressPhoto, ProgressManager, ProgressPhotoFilter, ProgressPhotoRecord};
pub use users::{UserManager, UserRecord};
pub use workouts::{
    ExerciseLogRecord, ExerciseSetRecord, HistoryRow, NewExerciseLog, NewTemplateExercise,
    PrRecord, TemplateExerciseRecord, WorkoutManager, WorkoutSessionRecord, WorkoutTemplateRecord,
};

use std::str::FromStr;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::config::DatabaseUrl;

/// Database handle shared by every request
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a database connection pool
    ///
    /// File databases are created when missing. In-memory databases use a
    /// single connection so every query sees the same data.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the pool cannot connect
    pub async fn new(url: &DatabaseUrl) -> Result<Self> {
        let pool = match url {
            DatabaseUrl::Memory => {
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect("sqlite::memory:")
                    .await?
            }
            DatabaseUrl::SQLite { path } => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                let options = SqliteConnectOptions::from_str(&url.to_connection_string())?
                    .create_if_missing(true);
                SqlitePoolOptions::new().connect_with(options).await?
            }
        };

        info!(database = %url, "Database connected");
        Ok(Self { pool })
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any table or index creation fails
    pub async fn migrate(&self) -> Result<()> {
        self.migrate_users().await?;
        self.migrate_profiles().await?;
        self.migrate_exercises().await?;
        self.migrate_workouts().await?;
        self.migrate_nutrition().await?;
        self.migrate_progress().await?;
        self.migrate_checkins().await?;
        self.migrate_chat().await?;
        self.migrate_ai().await?;
        self.migrate_coach().await?;
        self.migrate_payments().await?;

        self.seed_default_prompts().await?;

        info!("Database migrations complete");
        Ok(())
    }

    /// Check connectivity with a trivial query
    ///
    /// # Errors
    ///
    /// Returns an error if the database does not answer
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// User accounts
    #[must_use]
    pub fn users(&self) -> UserManager {
        UserManager::new(self.pool.clone())
    }

    /// Profiles, onboarding audit rows, coach interest
    #[must_use]
    pub fn profiles(&self) -> ProfileManager {
        ProfileManager::new(self.pool.clone())
    }

    /// Exercise catalogue
    #[must_use]
    pub fn exercises(&self) -> ExerciseManager {
        ExerciseManager::new(self.pool.clone())
    }

    /// Templates, sessions, logs, sets and PRs
    #[must_use]
    pub fn workouts(&self) -> WorkoutManager {
        WorkoutManager::new(self.pool.clone())
    }

    /// Foods, favorites and nutrition logs
    #[must_use]
    pub fn nutrition(&self) -> NutritionManager {
        NutritionManager::new(self.pool.clone())
    }

    /// Progress photos
    #[must_use]
    pub fn progress(&self) -> ProgressManager {
        ProgressManager::new(self.pool.clone())
    }

    /// Weekly and daily check-ins
    #[must_use]
    pub fn checkins(&self) -> CheckinManager {
        CheckinManager::new(self.pool.clone())
    }

    /// Chat threads and messages
    #[must_use]
    pub fn chat(&self) -> ChatManager {
        ChatManager::new(self.pool.clone())
    }

    /// Prompts and AI jobs
    #[must_use]
    pub fn ai(&self) -> AiManager {
        AiManager::new(self.pool.clone())
    }

    /// Coach marketplace profiles
    #[must_use]
    pub fn coach(&self) -> CoachManager {
        CoachManager::new(self.pool.clone())
    }

    /// Payment records
    #[must_use]
    pub fn payments(&self) -> PaymentManager {
        PaymentManager::new(self.pool.clone())
    }
}

// ============================================================================
// Column helpers
// ============================================================================

/// Current time in the sortable format used for every timestamp column
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Today's date as `YYYY-MM-DD` (UTC)
#[must_use]
pub fn today() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Read a TEXT column holding JSON; NULL and garbage become `Value::Null`
pub(crate) fn json_column(row: &SqliteRow, column: &str) -> Value {
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or(Value::Null)
}

/// Serialize a JSON value for a TEXT column; `Null` stays SQL NULL
pub(crate) fn json_text(value: &Value) -> Option<String> {
    if value.is_null() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Whether an error says a column is missing from the table
///
/// Matches both the `SQLite` and `PostgreSQL` wording so schema-drift
/// fallbacks work against either.
#[must_use]
pub fn is_missing_column_error(message: &str, column: &str) -> bool {
    let message = message.to_lowercase();
    let column = column.to_lowercase();
    message.contains(&column)
        && (message.contains("has no column named")
            || message.contains("no such column")
            || (message.contains("column") && message.contains("does not exist")))
}

/// Whether an error says a table is missing
#[must_use]
pub fn is_missing_table_error(message: &str, table: &str) -> bool {
    let message = message.to_lowercase();
    message.contains(&table.to_lowercase())
        && (message.contains("no such table") || message.contains("does not exist"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_detection() {
        assert!(is_missing_column_error(
            "error returned from database: table exercise_logs has no column named duration_minutes",
            "duration_minutes"
        ));
        assert!(is_missing_column_error(
            "column \"duration_minutes\" of relation \"exercise_logs\" does not exist",
            "duration_minutes"
        ));
        assert!(!is_missing_column_error(
            "UNIQUE constraint failed: users.email",
            "duration_minutes"
        ));
    }

    #[test]
    fn test_missing_table_detection() {
        assert!(is_missing_table_error("no such table: exercise_sets", "exercise_sets"));
        assert!(!is_missing_table_error("no such table: prs", "exercise_sets"));
    }

    #[test]
    fn test_timestamps_sort_lexicographically() {
        let first = now_timestamp();
        let second = now_timestamp();
        assert!(first <= second);
        assert!(first.ends_with('Z'));
    }
}
