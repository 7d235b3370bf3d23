// ABOUTME: Workout templates, sessions, exercise logs, set rows and personal records
// ABOUTME: Tolerates older schemas missing the duration_minutes column or the exercise_sets table
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;

use anyhow::Result;
use fitai_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    is_missing_column_error, is_missing_table_error, json_column, now_timestamp, Database,
};

impl Database {
    /// Create workout tables
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_workouts(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS workout_templates (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                mode TEXT NOT NULL DEFAULT 'manual',
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS workout_template_exercises (
                id TEXT PRIMARY KEY,
                template_id TEXT NOT NULL REFERENCES workout_templates(id) ON DELETE CASCADE,
                exercise_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                sets INTEGER NOT NULL DEFAULT 0,
                reps INTEGER NOT NULL DEFAULT 0,
                rest_seconds INTEGER NOT NULL DEFAULT 0,
                notes TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS workout_sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                template_id TEXT,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                duration_seconds INTEGER,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS exercise_logs (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                exercise_name TEXT NOT NULL,
                sets INTEGER NOT NULL DEFAULT 0,
                reps INTEGER NOT NULL DEFAULT 0,
                weight REAL NOT NULL DEFAULT 0,
                duration_minutes INTEGER,
                notes TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS exercise_sets (
                id TEXT PRIMARY KEY,
                exercise_log_id TEXT NOT NULL,
                set_index INTEGER NOT NULL DEFAULT 1,
                reps INTEGER NOT NULL DEFAULT 0,
                weight REAL NOT NULL DEFAULT 0,
                is_warmup INTEGER NOT NULL DEFAULT 0,
                duration_seconds INTEGER NOT NULL DEFAULT 0
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS prs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                exercise_name TEXT NOT NULL,
                metric TEXT NOT NULL,
                value REAL NOT NULL,
                recorded_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_templates_user ON workout_templates(user_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_template_exercises ON workout_template_exercises(template_id, position)",
            "CREATE INDEX IF NOT EXISTS idx_sessions_user ON workout_sessions(user_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_logs_session ON exercise_logs(session_id)",
            "CREATE INDEX IF NOT EXISTS idx_sets_log ON exercise_sets(exercise_log_id)",
            "CREATE INDEX IF NOT EXISTS idx_prs_user_exercise ON prs(user_id, exercise_name, metric)",
        ] {
            sqlx::query(index).execute(&self.pool).await?;
        }

        Ok(())
    }
}

// ============================================================================
// Records
// ============================================================================

/// Saved workout template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutTemplateRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    /// `manual`, `auto` or `coach`
    pub mode: String,
    pub metadata: Value,
    pub created_at: String,
    pub updated_at: String,
}

impl WorkoutTemplateRecord {
    fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            title: r.get("title"),
            description: r.get("description"),
            mode: r.get("mode"),
            metadata: json_column(r, "metadata"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

/// Exercise slot within a template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateExerciseRecord {
    pub id: String,
    pub template_id: String,
    pub exercise_id: String,
    pub position: i64,
    pub sets: i64,
    pub reps: i64,
    pub rest_seconds: i64,
    pub notes: Option<String>,
}

/// Exercise slot to insert
#[derive(Debug, Clone, Default)]
pub struct NewTemplateExercise {
    pub exercise_id: String,
    pub position: i64,
    pub sets: i64,
    pub reps: i64,
    pub rest_seconds: i64,
    pub notes: Option<String>,
}

/// Workout session, optionally joined with its template title
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSessionRecord {
    pub id: String,
    pub user_id: String,
    pub template_id: Option<String>,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub duration_seconds: Option<i64>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_title: Option<String>,
}

impl WorkoutSessionRecord {
    fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            template_id: r.get("template_id"),
            status: r.get("status"),
            started_at: r.get("started_at"),
            completed_at: r.get("completed_at"),
            duration_seconds: r.get("duration_seconds"),
            created_at: r.get("created_at"),
            template_title: r.try_get("template_title").ok().flatten(),
        }
    }
}

/// Logged exercise within a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseLogRecord {
    pub id: String,
    pub session_id: String,
    pub exercise_name: String,
    pub sets: i64,
    pub reps: i64,
    pub weight: f64,
    pub duration_minutes: Option<i64>,
    pub notes: Option<String>,
    pub created_at: String,
    /// Per-set rows ordered by `set_index`
    #[serde(default)]
    pub set_details: Vec<ExerciseSetRecord>,
}

impl ExerciseLogRecord {
    fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            session_id: r.get("session_id"),
            exercise_name: r.get("exercise_name"),
            sets: r.get("sets"),
            reps: r.get("reps"),
            weight: r.get("weight"),
            duration_minutes: r.try_get("duration_minutes").ok().flatten(),
            notes: r.get("notes"),
            created_at: r.get("created_at"),
            set_details: Vec::new(),
        }
    }
}

/// Individual set row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseSetRecord {
    #[serde(skip)]
    pub exercise_log_id: String,
    pub set_index: i64,
    pub reps: i64,
    pub weight: f64,
    pub is_warmup: bool,
    pub duration_seconds: i64,
}

/// Exercise log to insert
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewExerciseLog {
    pub exercise_name: String,
    pub sets: i64,
    pub reps: i64,
    pub weight: f64,
    pub duration_minutes: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub is_warmup: bool,
    pub set_index: Option<i64>,
    pub notes: Option<String>,
}

/// Personal record row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrRecord {
    pub id: String,
    pub user_id: String,
    pub exercise_name: String,
    pub metric: String,
    pub value: f64,
    pub recorded_at: String,
}

/// History entry: a log plus the date of the session it belongs to
#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub log: ExerciseLogRecord,
    pub session_date: String,
}

const TEMPLATE_COLUMNS: &str =
    "id, user_id, title, description, mode, metadata, created_at, updated_at";
const SESSION_COLUMNS: &str = "s.id, s.user_id, s.template_id, s.status, s.started_at, \
    s.completed_at, s.duration_seconds, s.created_at";

/// Workout database operations
pub struct WorkoutManager {
    pool: SqlitePool,
}

impl WorkoutManager {
    /// Create a new workout manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Templates
    // ========================================================================

    /// Insert a template and return its id
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn create_template(
        &self,
        user_id: &str,
        title: &str,
        description: Option<&str>,
        mode: &str,
        metadata: &Value,
    ) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let metadata = if metadata.is_null() {
            "{}".to_owned()
        } else {
            metadata.to_string()
        };
        sqlx::query(
            r"
            INSERT INTO workout_templates (id, user_id, title, description, mode, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ",
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(mode)
        .bind(metadata)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create template: {e}")))?;
        Ok(id)
    }

    /// Insert exercise slots for a template
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails
    pub async fn add_template_exercises(
        &self,
        template_id: &str,
        exercises: &[NewTemplateExercise],
    ) -> AppResult<()> {
        for exercise in exercises {
            sqlx::query(
                r"
                INSERT INTO workout_template_exercises
                    (id, template_id, exercise_id, position, sets, reps, rest_seconds, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(template_id)
            .bind(&exercise.exercise_id)
            .bind(exercise.position)
            .bind(exercise.sets)
            .bind(exercise.reps)
            .bind(exercise.rest_seconds)
            .bind(&exercise.notes)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to add template exercise: {e}")))?;
        }
        Ok(())
    }

    /// Templates for a user, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_templates(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> AppResult<Vec<WorkoutTemplateRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM workout_templates WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list templates: {e}")))?;

        Ok(rows.iter().map(WorkoutTemplateRecord::from_row).collect())
    }

    /// Fetch one template
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_template(&self, id: &str) -> AppResult<Option<WorkoutTemplateRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM workout_templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get template: {e}")))?;

        Ok(row.as_ref().map(WorkoutTemplateRecord::from_row))
    }

    /// Exercise slots of a template ordered by position
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn template_exercises(
        &self,
        template_id: &str,
    ) -> AppResult<Vec<TemplateExerciseRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, template_id, exercise_id, position, sets, reps, rest_seconds, notes
            FROM workout_template_exercises
            WHERE template_id = $1
            ORDER BY position
            ",
        )
        .bind(template_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load template exercises: {e}")))?;

        Ok(rows
            .iter()
            .map(|r| TemplateExerciseRecord {
                id: r.get("id"),
                template_id: r.get("template_id"),
                exercise_id: r.get("exercise_id"),
                position: r.get("position"),
                sets: r.get("sets"),
                reps: r.get("reps"),
                rest_seconds: r.get("rest_seconds"),
                notes: r.get("notes"),
            })
            .collect())
    }

    /// Update template fields; returns false when the template is missing
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails
    pub async fn update_template(
        &self,
        id: &str,
        title: Option<&str>,
        description: Option<&str>,
        mode: Option<&str>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE workout_templates SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                mode = COALESCE($4, mode),
                updated_at = $5
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(mode)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update template: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace all exercise slots of a template
    ///
    /// # Errors
    ///
    /// Returns an error if the delete or inserts fail
    pub async fn replace_template_exercises(
        &self,
        template_id: &str,
        exercises: &[NewTemplateExercise],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM workout_template_exercises WHERE template_id = $1")
            .bind(template_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to clear template exercises: {e}")))?;
        self.add_template_exercises(template_id, exercises).await
    }

    /// Delete a template and its slots; returns false when missing
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails
    pub async fn delete_template(&self, id: &str) -> AppResult<bool> {
        sqlx::query("DELETE FROM workout_template_exercises WHERE template_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete template exercises: {e}")))?;

        let result = sqlx::query("DELETE FROM workout_templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete template: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Start a session and return its id
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn start_session(
        &self,
        user_id: &str,
        template_id: Option<&str>,
        status: &str,
    ) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        sqlx::query(
            r"
            INSERT INTO workout_sessions (id, user_id, template_id, status, started_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ",
        )
        .bind(&id)
        .bind(user_id)
        .bind(template_id)
        .bind(status)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to start session: {e}")))?;
        Ok(id)
    }

    /// Fetch one session
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_session(&self, id: &str) -> AppResult<Option<WorkoutSessionRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM workout_sessions s WHERE s.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get session: {e}")))?;

        Ok(row.as_ref().map(WorkoutSessionRecord::from_row))
    }

    /// Latest sessions for a user with their template title
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_sessions(
        &self,
        user_id: &str,
        limit: i64,
    ) -> AppResult<Vec<WorkoutSessionRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS}, t.title AS template_title \
             FROM workout_sessions s \
             LEFT JOIN workout_templates t ON t.id = s.template_id \
             WHERE s.user_id = $1 \
             ORDER BY s.created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list sessions: {e}")))?;

        Ok(rows.iter().map(WorkoutSessionRecord::from_row).collect())
    }

    /// Most recent in-progress session
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn active_session(&self, user_id: &str) -> AppResult<Option<WorkoutSessionRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM workout_sessions s \
             WHERE s.user_id = $1 AND s.status = 'in_progress' \
             ORDER BY s.created_at DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get active session: {e}")))?;

        Ok(row.as_ref().map(WorkoutSessionRecord::from_row))
    }

    /// Mark a session finished
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails
    pub async fn complete_session(
        &self,
        id: &str,
        status: &str,
        duration_seconds: i64,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE workout_sessions
            SET status = $2, duration_seconds = $3, completed_at = $4
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status)
        .bind(duration_seconds)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to complete session: {e}")))?;
        Ok(())
    }

    // ========================================================================
    // Exercise logs
    // ========================================================================

    /// Insert an exercise log and its set row; returns the log id
    ///
    /// Cardio entries (`duration_minutes > 0`) store zero sets, reps and
    /// weight. On schemas without `duration_minutes` the minutes go into
    /// `reps` instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the log insert fails
    pub async fn insert_exercise_log(
        &self,
        session_id: &str,
        entry: &NewExerciseLog,
    ) -> AppResult<String> {
        let duration_minutes = entry.duration_minutes.unwrap_or(0);
        let has_duration = duration_minutes > 0;
        let duration_seconds = entry
            .duration_seconds
            .or_else(|| has_duration.then_some(duration_minutes * 60))
            .unwrap_or(0);
        let set_index = entry.set_index.filter(|i| *i > 0).unwrap_or(1);
        let (sets, reps, weight) = if has_duration {
            (0, 0, 0.0)
        } else {
            (entry.sets, entry.reps, entry.weight)
        };

        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let primary = sqlx::query(
            r"
            INSERT INTO exercise_logs
                (id, session_id, exercise_name, sets, reps, weight, duration_minutes, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(&id)
        .bind(session_id)
        .bind(&entry.exercise_name)
        .bind(sets)
        .bind(reps)
        .bind(weight)
        .bind(if has_duration { duration_minutes } else { 0 })
        .bind(&entry.notes)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(e) = primary {
            if !is_missing_column_error(&e.to_string(), "duration_minutes") {
                return Err(AppError::database(format!("Failed to log exercise: {e}")));
            }
            debug!("exercise_logs has no duration_minutes column; storing minutes in reps");
            sqlx::query(
                r"
                INSERT INTO exercise_logs
                    (id, session_id, exercise_name, sets, reps, weight, notes, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(&id)
            .bind(session_id)
            .bind(&entry.exercise_name)
            .bind(sets)
            .bind(if has_duration { duration_minutes } else { reps })
            .bind(weight)
            .bind(&entry.notes)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to log exercise: {e}")))?;
        }

        let set_result = sqlx::query(
            r"
            INSERT INTO exercise_sets
                (id, exercise_log_id, set_index, reps, weight, is_warmup, duration_seconds)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&id)
        .bind(set_index)
        .bind(reps)
        .bind(weight)
        .bind(entry.is_warmup)
        .bind(duration_seconds)
        .execute(&self.pool)
        .await;

        match set_result {
            Ok(_) => {}
            Err(e) if is_missing_table_error(&e.to_string(), "exercise_sets") => {
                debug!("exercise_sets table missing; skipping set row");
            }
            Err(e) => return Err(AppError::database(format!("Failed to log set: {e}"))),
        }

        Ok(id)
    }

    /// Logs of a session in insertion order, each with its set rows
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn session_logs(&self, session_id: &str) -> AppResult<Vec<ExerciseLogRecord>> {
        let mut logs = self
            .select_logs("WHERE session_id = $1 ORDER BY created_at", &[session_id], None)
            .await?;

        let ids: Vec<String> = logs.iter().map(|l| l.id.clone()).collect();
        let mut sets = self.sets_for_logs(&ids).await?;
        for log in &mut logs {
            log.set_details = sets.remove(&log.id).unwrap_or_default();
        }
        Ok(logs)
    }

    /// Logs for several sessions, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn logs_for_sessions(
        &self,
        session_ids: &[String],
        limit: i64,
    ) -> AppResult<Vec<ExerciseLogRecord>> {
        if session_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = placeholders(session_ids.len(), 1);
        let refs: Vec<&str> = session_ids.iter().map(String::as_str).collect();
        self.select_logs(
            &format!("WHERE session_id IN ({placeholders}) ORDER BY created_at DESC"),
            &refs,
            Some(limit),
        )
        .await
    }

    /// Logs of one exercise across a user's sessions, newest first, with the session date
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn exercise_history(
        &self,
        user_id: &str,
        exercise_name: &str,
        limit: i64,
    ) -> AppResult<Vec<HistoryRow>> {
        let rows = sqlx::query(
            r"
            SELECT l.id, l.session_id, l.exercise_name, l.sets, l.reps, l.weight,
                   l.notes, l.created_at, s.created_at AS session_date
            FROM exercise_logs l
            JOIN workout_sessions s ON s.id = l.session_id
            WHERE s.user_id = $1 AND l.exercise_name = $2
            ORDER BY l.created_at DESC
            LIMIT $3
            ",
        )
        .bind(user_id)
        .bind(exercise_name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load exercise history: {e}")))?;

        Ok(rows
            .iter()
            .map(|r| HistoryRow {
                log: ExerciseLogRecord::from_row(r),
                session_date: r.get("session_date"),
            })
            .collect())
    }

    async fn select_logs(
        &self,
        clause: &str,
        binds: &[&str],
        limit: Option<i64>,
    ) -> AppResult<Vec<ExerciseLogRecord>> {
        let limit_clause = limit.map(|l| format!(" LIMIT {l}")).unwrap_or_default();
        let full = format!(
            "SELECT id, session_id, exercise_name, sets, reps, weight, duration_minutes, notes, \
             created_at FROM exercise_logs {clause}{limit_clause}"
        );
        let mut query = sqlx::query(&full);
        for bind in binds {
            query = query.bind(*bind);
        }

        match query.fetch_all(&self.pool).await {
            Ok(rows) => Ok(rows.iter().map(ExerciseLogRecord::from_row).collect()),
            Err(e) if is_missing_column_error(&e.to_string(), "duration_minutes") => {
                let legacy = format!(
                    "SELECT id, session_id, exercise_name, sets, reps, weight, notes, created_at \
                     FROM exercise_logs {clause}{limit_clause}"
                );
                let mut query = sqlx::query(&legacy);
                for bind in binds {
                    query = query.bind(*bind);
                }
                let rows = query
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| AppError::database(format!("Failed to load logs: {e}")))?;
                Ok(rows.iter().map(ExerciseLogRecord::from_row).collect())
            }
            Err(e) => Err(AppError::database(format!("Failed to load logs: {e}"))),
        }
    }

    async fn sets_for_logs(
        &self,
        log_ids: &[String],
    ) -> AppResult<HashMap<String, Vec<ExerciseSetRecord>>> {
        if log_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT exercise_log_id, set_index, reps, weight, is_warmup, duration_seconds \
             FROM exercise_sets WHERE exercise_log_id IN ({}) ORDER BY set_index",
            placeholders(log_ids.len(), 1)
        );
        let mut query = sqlx::query(&sql);
        for id in log_ids {
            query = query.bind(id);
        }

        let rows = match query.fetch_all(&self.pool).await {
            Ok(rows) => rows,
            Err(e) if is_missing_table_error(&e.to_string(), "exercise_sets") => {
                warn!("exercise_sets table missing; returning logs without set details");
                return Ok(HashMap::new());
            }
            Err(e) => return Err(AppError::database(format!("Failed to load sets: {e}"))),
        };

        let mut map: HashMap<String, Vec<ExerciseSetRecord>> = HashMap::new();
        for r in &rows {
            let record = ExerciseSetRecord {
                exercise_log_id: r.get("exercise_log_id"),
                set_index: r.get("set_index"),
                reps: r.get("reps"),
                weight: r.get("weight"),
                is_warmup: r.get::<i64, _>("is_warmup") != 0,
                duration_seconds: r.get("duration_seconds"),
            };
            map.entry(record.exercise_log_id.clone())
                .or_default()
                .push(record);
        }
        Ok(map)
    }

    // ========================================================================
    // Personal records
    // ========================================================================

    /// Highest stored value for an exercise and metric
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn best_pr(
        &self,
        user_id: &str,
        exercise_name: &str,
        metric: &str,
    ) -> AppResult<Option<f64>> {
        sqlx::query_scalar(
            r"
            SELECT value FROM prs
            WHERE user_id = $1 AND exercise_name = $2 AND metric = $3
            ORDER BY value DESC LIMIT 1
            ",
        )
        .bind(user_id)
        .bind(exercise_name)
        .bind(metric)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to look up PR: {e}")))
    }

    /// Record a personal record
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn insert_pr(
        &self,
        user_id: &str,
        exercise_name: &str,
        metric: &str,
        value: f64,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO prs (id, user_id, exercise_name, metric, value, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(exercise_name)
        .bind(metric)
        .bind(value)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record PR: {e}")))?;
        Ok(())
    }

    /// Most recent PRs for a user
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn recent_prs(&self, user_id: &str, limit: i64) -> AppResult<Vec<PrRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, exercise_name, metric, value, recorded_at
            FROM prs WHERE user_id = $1
            ORDER BY recorded_at DESC LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load PRs: {e}")))?;

        Ok(rows
            .iter()
            .map(|r| PrRecord {
                id: r.get("id"),
                user_id: r.get("user_id"),
                exercise_name: r.get("exercise_name"),
                metric: r.get("metric"),
                value: r.get("value"),
                recorded_at: r.get("recorded_at"),
            })
            .collect())
    }
}

/// `$start, $start+1, ...` for `count` bind parameters
fn placeholders(count: usize, start: usize) -> String {
    (start..start + count)
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ")
}
