// ABOUTME: Exercise catalogue database operations
// ABOUTME: Create, substring search, and find-or-create by name for template building
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;

use anyhow::Result;
use fitai_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::{json_column, now_timestamp, Database};

impl Database {
    /// Create the exercises table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_exercises(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS exercises (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                muscle_groups TEXT NOT NULL DEFAULT '[]',
                equipment TEXT NOT NULL DEFAULT '[]',
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_exercises_name ON exercises(name)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Catalogue entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub id: String,
    pub name: String,
    pub muscle_groups: Value,
    pub equipment: Value,
    pub metadata: Value,
    pub created_at: String,
}

impl ExerciseRecord {
    fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            name: r.get("name"),
            muscle_groups: json_column(r, "muscle_groups"),
            equipment: json_column(r, "equipment"),
            metadata: json_column(r, "metadata"),
            created_at: r.get("created_at"),
        }
    }
}

/// Exercise catalogue operations
pub struct ExerciseManager {
    pool: SqlitePool,
}

impl ExerciseManager {
    /// Create a new exercise manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an exercise
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn create(
        &self,
        name: &str,
        muscle_groups: &Value,
        equipment: &Value,
        metadata: &Value,
    ) -> AppResult<ExerciseRecord> {
        let record = ExerciseRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_owned(),
            muscle_groups: array_or_empty(muscle_groups),
            equipment: array_or_empty(equipment),
            metadata: if metadata.is_object() {
                metadata.clone()
            } else {
                Value::Object(serde_json::Map::new())
            },
            created_at: now_timestamp(),
        };

        sqlx::query(
            r"
            INSERT INTO exercises (id, name, muscle_groups, equipment, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(record.muscle_groups.to_string())
        .bind(record.equipment.to_string())
        .bind(record.metadata.to_string())
        .bind(&record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create exercise: {e}")))?;

        Ok(record)
    }

    /// Case-insensitive substring search on the name
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn search(&self, query: &str, limit: i64) -> AppResult<Vec<ExerciseRecord>> {
        let pattern = format!("%{}%", query.to_lowercase());
        let rows = sqlx::query(
            r"
            SELECT id, name, muscle_groups, equipment, metadata, created_at
            FROM exercises
            WHERE LOWER(name) LIKE $1
            ORDER BY name
            LIMIT $2
            ",
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to search exercises: {e}")))?;

        Ok(rows.iter().map(ExerciseRecord::from_row).collect())
    }

    /// Exact name lookup
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<ExerciseRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, name, muscle_groups, equipment, metadata, created_at
            FROM exercises WHERE name = $1 LIMIT 1
            ",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to look up exercise: {e}")))?;

        Ok(row.as_ref().map(ExerciseRecord::from_row))
    }

    /// Return the id of the exercise with this name, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or insert fails
    pub async fn get_or_create(
        &self,
        name: &str,
        muscle_groups: &Value,
        equipment: &Value,
    ) -> AppResult<String> {
        if let Some(existing) = self.find_by_name(name).await? {
            return Ok(existing.id);
        }
        let created = self
            .create(name, muscle_groups, equipment, &Value::Null)
            .await?;
        Ok(created.id)
    }

    /// Fetch several exercises keyed by id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_many(&self, ids: &[String]) -> AppResult<HashMap<String, ExerciseRecord>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = (1..=ids.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, name, muscle_groups, equipment, metadata, created_at \
             FROM exercises WHERE id IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to load exercises: {e}")))?;

        Ok(rows
            .iter()
            .map(ExerciseRecord::from_row)
            .map(|e| (e.id.clone(), e))
            .collect())
    }
}

fn array_or_empty(value: &Value) -> Value {
    if value.is_array() {
        value.clone()
    } else {
        Value::Array(Vec::new())
    }
}
