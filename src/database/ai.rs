// ABOUTME: Versioned prompt templates and AI job audit rows
// ABOUTME: Seeds the default prompts used by onboarding, workouts, nutrition and check-ins
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::Result;
use fitai_core::constants::prompts;
use fitai_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::{json_column, json_text, now_timestamp, Database};

const WORKOUT_GENERATION_TEMPLATE: &str = "You are a strength coach. Build one workout from the \
JSON inputs (muscle_groups, workout_type, equipment, experience, goal, duration_minutes). \
Respond with JSON only: {\"title\": string, \"summary\": string, \"exercises\": [{\"name\": \
string, \"sets\": integer, \"reps\": integer or string range, \"rest_seconds\": integer, \
\"notes\": string}]}.";

const WEEKLY_CHECKIN_TEMPLATE: &str = "You are a nutrition coach reviewing a weekly check-in. \
The JSON inputs contain adherence answers and optional progress photos. Respond with JSON only: \
{\"summary\": string, \"macro_delta\": {\"calories\": number, \"protein\": number, \"carbs\": \
number, \"fats\": number}, \"cardio\": string}. Keep changes small; use 0 when no change is needed.";

const MEAL_PHOTO_TEMPLATE: &str = "You estimate nutrition from meal photos. Respond with JSON \
only: {\"items\": [{\"name\": string, \"calories\": number, \"protein\": number, \"carbs\": \
number, \"fats\": number}], \"totals\": {\"calories\": number, \"protein\": number, \"carbs\": \
number, \"fats\": number}}.";

const MACRO_GENERATION_TEMPLATE: &str = "You set daily macro targets. The JSON inputs hold the \
user's age, sex, height_cm, weight_kg, goal and training days per week. Respond with JSON only: \
{\"calories\": number, \"protein\": number, \"carbs\": number, \"fats\": number}.";

impl Database {
    /// Create prompt and job tables
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_ai(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS ai_prompts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                version INTEGER NOT NULL,
                template TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(name, version)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS ai_jobs (
                id TEXT PRIMARY KEY,
                user_id TEXT,
                prompt_id TEXT NOT NULL,
                prompt_name TEXT NOT NULL,
                input TEXT,
                output TEXT,
                status TEXT NOT NULL,
                metadata TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_ai_jobs_user ON ai_jobs(user_id, created_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert version 1 of each built-in prompt that does not exist yet
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup or insert fails
    pub(super) async fn seed_default_prompts(&self) -> Result<()> {
        let defaults = [
            (prompts::WORKOUT_GENERATION, WORKOUT_GENERATION_TEMPLATE),
            (prompts::WEEKLY_CHECKIN_ANALYSIS, WEEKLY_CHECKIN_TEMPLATE),
            (prompts::MEAL_PHOTO_PARSE, MEAL_PHOTO_TEMPLATE),
            (prompts::MACRO_GENERATION, MACRO_GENERATION_TEMPLATE),
        ];

        let mut seeded = 0;
        for (name, template) in defaults {
            let result = sqlx::query(
                r"
                INSERT OR IGNORE INTO ai_prompts (id, name, version, template, created_at)
                SELECT $1, $2, 1, $3, $4
                WHERE NOT EXISTS (SELECT 1 FROM ai_prompts WHERE name = $2)
                ",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(name)
            .bind(template)
            .bind(now_timestamp())
            .execute(&self.pool)
            .await?;
            seeded += result.rows_affected();
        }

        if seeded > 0 {
            info!(count = seeded, "Seeded default AI prompts");
        }
        Ok(())
    }
}

/// Prompt template version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiPromptRecord {
    pub id: String,
    pub name: String,
    pub version: i64,
    pub template: String,
    pub created_at: String,
}

impl AiPromptRecord {
    fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            name: r.get("name"),
            version: r.get("version"),
            template: r.get("template"),
            created_at: r.get("created_at"),
        }
    }
}

/// Audit row for one prompt run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiJobRecord {
    pub id: String,
    pub user_id: Option<String>,
    pub prompt_id: String,
    pub prompt_name: String,
    pub input: Value,
    pub output: Option<String>,
    /// `running`, `completed` or `failed`
    pub status: String,
    pub metadata: Value,
    pub created_at: String,
    pub updated_at: String,
}

impl AiJobRecord {
    fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            prompt_id: r.get("prompt_id"),
            prompt_name: r.get("prompt_name"),
            input: json_column(r, "input"),
            output: r.get("output"),
            status: r.get("status"),
            metadata: json_column(r, "metadata"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

const JOB_COLUMNS: &str = "id, user_id, prompt_id, prompt_name, input, output, status, metadata, \
    created_at, updated_at";

/// Prompt and job operations
pub struct AiManager {
    pool: SqlitePool,
}

impl AiManager {
    /// Create a new AI manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Highest version of a prompt
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn latest_prompt(&self, name: &str) -> AppResult<Option<AiPromptRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, name, version, template, created_at
            FROM ai_prompts WHERE name = $1
            ORDER BY version DESC LIMIT 1
            ",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load prompt: {e}")))?;

        Ok(row.as_ref().map(AiPromptRecord::from_row))
    }

    /// Store a new prompt version; the version defaults to latest + 1
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` when the version is taken
    pub async fn create_prompt(
        &self,
        name: &str,
        template: &str,
        version: Option<i64>,
    ) -> AppResult<AiPromptRecord> {
        let version = match version {
            Some(v) => v,
            None => self.latest_prompt(name).await?.map_or(1, |p| p.version + 1),
        };
        let record = AiPromptRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_owned(),
            version,
            template: template.to_owned(),
            created_at: now_timestamp(),
        };

        sqlx::query(
            r"
            INSERT INTO ai_prompts (id, name, version, template, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(record.version)
        .bind(&record.template)
        .bind(&record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::already_exists(format!("Prompt {name} version {version}"))
            } else {
                AppError::database(format!("Failed to create prompt: {e}"))
            }
        })?;

        Ok(record)
    }

    /// Record a running job and return its id
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn start_job(
        &self,
        user_id: Option<&str>,
        prompt: &AiPromptRecord,
        input: &Value,
    ) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        sqlx::query(&format!(
            "INSERT INTO ai_jobs ({JOB_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, NULL, 'running', $6, $7, $7)"
        ))
        .bind(&id)
        .bind(user_id)
        .bind(&prompt.id)
        .bind(&prompt.name)
        .bind(json_text(input))
        .bind(serde_json::json!({ "version": prompt.version }).to_string())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record AI job: {e}")))?;
        Ok(id)
    }

    /// Mark a job completed with its output
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails
    pub async fn complete_job(&self, id: &str, output: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE ai_jobs SET status = 'completed', output = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(output)
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to complete AI job: {e}")))?;
        Ok(())
    }

    /// Mark a job failed, recording the error in its metadata
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails
    pub async fn fail_job(&self, id: &str, error: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE ai_jobs SET status = 'failed', metadata = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(serde_json::json!({ "error": error }).to_string())
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to mark AI job failed: {e}")))?;
        Ok(())
    }

    /// Recent jobs for a user
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_jobs(&self, user_id: &str, limit: i64) -> AppResult<Vec<AiJobRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM ai_jobs WHERE user_id = $1 \
             ORDER BY created_at DESC, rowid DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list AI jobs: {e}")))?;

        Ok(rows.iter().map(AiJobRecord::from_row).collect())
    }

    /// Fetch one job
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_job(&self, id: &str) -> AppResult<Option<AiJobRecord>> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM ai_jobs WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to load AI job: {e}")))?;

        Ok(row.as_ref().map(AiJobRecord::from_row))
    }
}
