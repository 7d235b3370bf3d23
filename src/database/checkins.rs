// ABOUTME: Weekly check-in and daily streak check-in database operations
// ABOUTME: Weekly rows carry AI analysis and macro updates; daily rows are unique per user and date
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::Result;
use fitai_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::{json_column, json_text, now_timestamp, Database};

impl Database {
    /// Create check-in tables
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_checkins(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS weekly_checkins (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                weight REAL,
                adherence TEXT,
                photos TEXT,
                ai_summary TEXT,
                macro_update TEXT,
                cardio_update TEXT,
                notes TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS daily_checkins (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                hit_macros INTEGER NOT NULL,
                training_status TEXT NOT NULL CHECK (training_status IN ('trained', 'off_day')),
                sleep_quality TEXT NOT NULL CHECK (sleep_quality IN ('good', 'okay', 'poor')),
                coach_response TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(user_id, date)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_weekly_checkins_user ON weekly_checkins(user_id, date)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Stored weekly check-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyCheckinRecord {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub weight: Option<f64>,
    pub adherence: Value,
    /// `[{url}]`, or null once retention cleared it
    pub photos: Value,
    pub ai_summary: Value,
    pub macro_update: Value,
    pub cardio_update: Value,
    pub notes: Option<String>,
    pub created_at: String,
}

impl WeeklyCheckinRecord {
    fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            date: r.get("date"),
            weight: r.get("weight"),
            adherence: json_column(r, "adherence"),
            photos: json_column(r, "photos"),
            ai_summary: json_column(r, "ai_summary"),
            macro_update: json_column(r, "macro_update"),
            cardio_update: json_column(r, "cardio_update"),
            notes: r.get("notes"),
            created_at: r.get("created_at"),
        }
    }

    /// URLs listed in the `photos` column
    #[must_use]
    pub fn photo_urls(&self) -> Vec<String> {
        self.photos
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|p| p.get("url").and_then(Value::as_str))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Weekly check-in to insert
#[derive(Debug, Clone, Default)]
pub struct NewWeeklyCheckin {
    pub user_id: String,
    pub date: String,
    pub weight: Option<f64>,
    pub adherence: Value,
    pub photos: Value,
    pub ai_summary: Value,
    pub macro_update: Value,
    pub cardio_update: Value,
}

/// Stored daily check-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCheckinRecord {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub hit_macros: bool,
    pub training_status: String,
    pub sleep_quality: String,
    pub coach_response: Option<String>,
    pub created_at: String,
}

const WEEKLY_COLUMNS: &str = "id, user_id, date, weight, adherence, photos, ai_summary, \
    macro_update, cardio_update, notes, created_at";

/// Check-in database operations
pub struct CheckinManager {
    pool: SqlitePool,
}

impl CheckinManager {
    /// Create a new check-in manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a weekly check-in
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn insert_weekly(&self, checkin: &NewWeeklyCheckin) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(&format!(
            "INSERT INTO weekly_checkins ({WEEKLY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, $10)"
        ))
        .bind(&id)
        .bind(&checkin.user_id)
        .bind(&checkin.date)
        .bind(checkin.weight)
        .bind(json_text(&checkin.adherence))
        .bind(json_text(&checkin.photos))
        .bind(json_text(&checkin.ai_summary))
        .bind(json_text(&checkin.macro_update))
        .bind(json_text(&checkin.cardio_update))
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save check-in: {e}")))?;
        Ok(id)
    }

    /// Weekly check-ins, newest date first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_weekly(&self, user_id: &str, limit: i64) -> AppResult<Vec<WeeklyCheckinRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {WEEKLY_COLUMNS} FROM weekly_checkins WHERE user_id = $1 \
             ORDER BY date DESC, created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list check-ins: {e}")))?;

        Ok(rows.iter().map(WeeklyCheckinRecord::from_row).collect())
    }

    /// Most recent weekly check-in
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn latest_weekly(&self, user_id: &str) -> AppResult<Option<WeeklyCheckinRecord>> {
        Ok(self.list_weekly(user_id, 1).await?.into_iter().next())
    }

    /// Check-ins beyond the newest `keep` that still reference photos
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn expired_photo_checkins(
        &self,
        user_id: &str,
        keep: i64,
    ) -> AppResult<Vec<WeeklyCheckinRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {WEEKLY_COLUMNS} FROM weekly_checkins WHERE user_id = $1 \
             ORDER BY date DESC, created_at DESC LIMIT -1 OFFSET $2"
        ))
        .bind(user_id)
        .bind(keep)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load old check-ins: {e}")))?;

        Ok(rows
            .iter()
            .map(WeeklyCheckinRecord::from_row)
            .filter(|c| !c.photo_urls().is_empty())
            .collect())
    }

    /// Drop the photo list of a check-in
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails
    pub async fn clear_photos(&self, id: &str) -> AppResult<()> {
        sqlx::query("UPDATE weekly_checkins SET photos = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to clear check-in photos: {e}")))?;
        Ok(())
    }

    // ========================================================================
    // Daily check-ins
    // ========================================================================

    /// Insert or replace today's daily check-in
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails
    pub async fn upsert_daily(
        &self,
        user_id: &str,
        date: &str,
        hit_macros: bool,
        training_status: &str,
        sleep_quality: &str,
        coach_response: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO daily_checkins (id, user_id, date, hit_macros, training_status,
                                        sleep_quality, coach_response, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT(user_id, date) DO UPDATE SET
                hit_macros = excluded.hit_macros,
                training_status = excluded.training_status,
                sleep_quality = excluded.sleep_quality,
                coach_response = excluded.coach_response
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(date)
        .bind(hit_macros)
        .bind(training_status)
        .bind(sleep_quality)
        .bind(coach_response)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save daily check-in: {e}")))?;
        Ok(())
    }

    /// Daily check-in for one date
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn daily_for_date(
        &self,
        user_id: &str,
        date: &str,
    ) -> AppResult<Option<DailyCheckinRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, date, hit_macros, training_status, sleep_quality,
                   coach_response, created_at
            FROM daily_checkins WHERE user_id = $1 AND date = $2
            ",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load daily check-in: {e}")))?;

        Ok(row.map(|r| DailyCheckinRecord {
            id: r.get("id"),
            user_id: r.get("user_id"),
            date: r.get("date"),
            hit_macros: r.get::<i64, _>("hit_macros") != 0,
            training_status: r.get("training_status"),
            sleep_quality: r.get("sleep_quality"),
            coach_response: r.get("coach_response"),
            created_at: r.get("created_at"),
        }))
    }

    /// Distinct daily check-in dates, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn daily_dates(&self, user_id: &str, limit: i64) -> AppResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT DISTINCT date FROM daily_checkins WHERE user_id = $1 ORDER BY date DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load check-in dates: {e}")))
    }
}
