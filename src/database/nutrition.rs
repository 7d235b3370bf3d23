// ABOUTME: Nutrition database operations for foods, search history, favorites and meal logs
// ABOUTME: Items and totals are stored as JSON text so photo and manual logs share one row shape
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::Result;
use fitai_core::errors::{AppError, AppResult};
use fitai_core::models::MacroTargets;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::{json_column, now_timestamp, Database};

impl Database {
    /// Create nutrition tables
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_nutrition(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS food_items (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                brand TEXT,
                serving_size REAL,
                serving_unit TEXT,
                calories REAL NOT NULL DEFAULT 0,
                protein REAL NOT NULL DEFAULT 0,
                carbs REAL NOT NULL DEFAULT 0,
                fats REAL NOT NULL DEFAULT 0,
                source TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS search_history (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                query TEXT NOT NULL,
                source TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS nutrition_favorites (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                food_item_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS nutrition_logs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                meal_type TEXT NOT NULL,
                items TEXT NOT NULL DEFAULT '[]',
                totals TEXT NOT NULL DEFAULT '{}',
                photo_url TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_nutrition_logs_user_date ON nutrition_logs(user_id, date)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Food in the local catalogue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodItemRecord {
    pub id: String,
    pub name: String,
    pub brand: Option<String>,
    pub serving_size: Option<f64>,
    pub serving_unit: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub source: Option<String>,
    pub created_at: String,
}

impl FoodItemRecord {
    fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            name: r.get("name"),
            brand: r.get("brand"),
            serving_size: r.get("serving_size"),
            serving_unit: r.get("serving_unit"),
            calories: r.get("calories"),
            protein: r.get("protein"),
            carbs: r.get("carbs"),
            fats: r.get("fats"),
            source: r.get("source"),
            created_at: r.get("created_at"),
        }
    }
}

/// Saved favorite food
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub id: String,
    pub user_id: String,
    pub food_item_id: String,
    pub created_at: String,
}

/// Logged meal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionLogRecord {
    pub id: String,
    pub user_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub meal_type: String,
    pub items: Value,
    pub totals: Value,
    pub photo_url: Option<String>,
    pub created_at: String,
}

impl NutritionLogRecord {
    fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            date: r.get("date"),
            meal_type: r.get("meal_type"),
            items: json_column(r, "items"),
            totals: json_column(r, "totals"),
            photo_url: r.get("photo_url"),
            created_at: r.get("created_at"),
        }
    }
}

/// Meal log to insert
#[derive(Debug, Clone)]
pub struct NewNutritionLog {
    pub user_id: String,
    pub date: String,
    pub meal_type: String,
    pub items: Value,
    pub totals: MacroTargets,
    pub photo_url: Option<String>,
}

const LOG_COLUMNS: &str = "id, user_id, date, meal_type, items, totals, photo_url, created_at";

/// Nutrition database operations
pub struct NutritionManager {
    pool: SqlitePool,
}

impl NutritionManager {
    /// Create a new nutrition manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Case-insensitive substring search over local foods
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn search_foods(&self, query: &str, limit: i64) -> AppResult<Vec<FoodItemRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, brand, serving_size, serving_unit, calories, protein, carbs, fats,
                   source, created_at
            FROM food_items
            WHERE LOWER(name) LIKE $1
            ORDER BY name
            LIMIT $2
            ",
        )
        .bind(format!("%{}%", query.to_lowercase()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to search foods: {e}")))?;

        Ok(rows.iter().map(FoodItemRecord::from_row).collect())
    }

    /// Add a food to the local catalogue
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn create_food_item(
        &self,
        name: &str,
        brand: Option<&str>,
        serving: Option<(f64, &str)>,
        macros: &MacroTargets,
        source: &str,
    ) -> AppResult<FoodItemRecord> {
        let record = FoodItemRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_owned(),
            brand: brand.map(str::to_owned),
            serving_size: serving.map(|(size, _)| size),
            serving_unit: serving.map(|(_, unit)| unit.to_owned()),
            calories: macros.calories,
            protein: macros.protein,
            carbs: macros.carbs,
            fats: macros.fats,
            source: Some(source.to_owned()),
            created_at: now_timestamp(),
        };

        sqlx::query(
            r"
            INSERT INTO food_items (id, name, brand, serving_size, serving_unit, calories, protein,
                                    carbs, fats, source, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.brand)
        .bind(record.serving_size)
        .bind(&record.serving_unit)
        .bind(record.calories)
        .bind(record.protein)
        .bind(record.carbs)
        .bind(record.fats)
        .bind(&record.source)
        .bind(&record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create food item: {e}")))?;

        Ok(record)
    }

    /// Remember a search query
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn record_search(&self, user_id: &str, query: &str, source: &str) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO search_history (id, user_id, query, source, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(query)
        .bind(source)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record search: {e}")))?;
        Ok(())
    }

    /// Number of recorded searches for a user
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn count_searches(&self, user_id: &str) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM search_history WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count searches: {e}")))
    }

    /// Save a favorite food
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn add_favorite(&self, user_id: &str, food_item_id: &str) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO nutrition_favorites (id, user_id, food_item_id, created_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(food_item_id)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save favorite: {e}")))?;
        Ok(())
    }

    /// Favorites for a user
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_favorites(&self, user_id: &str, limit: i64) -> AppResult<Vec<FavoriteRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, food_item_id, created_at
            FROM nutrition_favorites WHERE user_id = $1
            ORDER BY created_at DESC LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list favorites: {e}")))?;

        Ok(rows
            .iter()
            .map(|r| FavoriteRecord {
                id: r.get("id"),
                user_id: r.get("user_id"),
                food_item_id: r.get("food_item_id"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    /// Insert a meal log and return the stored row
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database insert fails
    pub async fn insert_log(&self, log: &NewNutritionLog) -> AppResult<NutritionLogRecord> {
        let record = NutritionLogRecord {
            id: Uuid::new_v4().to_string(),
            user_id: log.user_id.clone(),
            date: log.date.clone(),
            meal_type: log.meal_type.clone(),
            items: log.items.clone(),
            totals: serde_json::to_value(log.totals)?,
            photo_url: log.photo_url.clone(),
            created_at: now_timestamp(),
        };

        sqlx::query(&format!(
            "INSERT INTO nutrition_logs ({LOG_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.date)
        .bind(&record.meal_type)
        .bind(record.items.to_string())
        .bind(record.totals.to_string())
        .bind(&record.photo_url)
        .bind(&record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to log meal: {e}")))?;

        Ok(record)
    }

    /// Logs for a user, optionally for one date, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_logs(
        &self,
        user_id: &str,
        date: Option<&str>,
        limit: i64,
    ) -> AppResult<Vec<NutritionLogRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {LOG_COLUMNS} FROM nutrition_logs \
             WHERE user_id = $1 AND ($2 IS NULL OR date = $2) \
             ORDER BY date DESC, created_at DESC LIMIT $3"
        ))
        .bind(user_id)
        .bind(date)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list meal logs: {e}")))?;

        Ok(rows.iter().map(NutritionLogRecord::from_row).collect())
    }

    /// Logs dated on or after `since` (`YYYY-MM-DD`), newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn logs_since(
        &self,
        user_id: &str,
        since: &str,
        limit: i64,
    ) -> AppResult<Vec<NutritionLogRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {LOG_COLUMNS} FROM nutrition_logs \
             WHERE user_id = $1 AND date >= $2 \
             ORDER BY date DESC, created_at DESC LIMIT $3"
        ))
        .bind(user_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load recent meal logs: {e}")))?;

        Ok(rows.iter().map(NutritionLogRecord::from_row).collect())
    }
}
