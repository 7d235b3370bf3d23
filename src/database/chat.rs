// ABOUTME: Chat thread, message and thread-summary database operations
// ABOUTME: Message metadata carries workout results and pending coach action proposals
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
    /// Create chat tables
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_chat(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS chat_threads (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_message_at TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant', 'system')),
                content TEXT NOT NULL,
                model TEXT,
                metadata TEXT,
                safety_flags TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS chat_thread_summaries (
                thread_id TEXT PRIMARY KEY,
                summary TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chat_threads_user ON chat_threads(user_id, last_message_at)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chat_messages_thread ON chat_messages(thread_id, created_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Conversation thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatThreadRecord {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_message_at: Option<String>,
}

impl ChatThreadRecord {
    fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            title: r.get("title"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
            last_message_at: r.get("last_message_at"),
        }
    }
}

/// Stored chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageRecord {
    pub id: String,
    pub thread_id: String,
    pub user_id: String,
    pub role: String,
    pub content: String,
    pub model: Option<String>,
    pub metadata: Value,
    pub safety_flags: Value,
    pub created_at: String,
}

impl ChatMessageRecord {
    fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            thread_id: r.get("thread_id"),
            user_id: r.get("user_id"),
            role: r.get("role"),
            content: r.get("content"),
            model: r.get("model"),
            metadata: json_column(r, "metadata"),
            safety_flags: json_column(r, "safety_flags"),
            created_at: r.get("created_at"),
        }
    }
}

/// Message to insert
#[derive(Debug, Clone, Default)]
pub struct NewChatMessage {
    pub thread_id: String,
    pub user_id: String,
    pub role: String,
    pub content: String,
    pub model: Option<String>,
    pub metadata: Value,
    pub safety_flags: Vec<String>,
}

const THREAD_COLUMNS: &str = "id, user_id, title, created_at, updated_at, last_message_at";
const MESSAGE_COLUMNS: &str =
    "id, thread_id, user_id, role, content, model, metadata, safety_flags, created_at";

/// Chat database operations
pub struct ChatManager {
    pool: SqlitePool,
}

impl ChatManager {
    /// Create a new chat manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a thread
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn create_thread(
        &self,
        user_id: &str,
        title: Option<&str>,
    ) -> AppResult<ChatThreadRecord> {
        let now = now_timestamp();
        let record = ChatThreadRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_owned(),
            title: title.map(str::to_owned),
            created_at: now.clone(),
            updated_at: now.clone(),
            last_message_at: Some(now),
        };

        sqlx::query(&format!(
            "INSERT INTO chat_threads ({THREAD_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.title)
        .bind(&record.created_at)
        .bind(&record.updated_at)
        .bind(&record.last_message_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create thread: {e}")))?;

        Ok(record)
    }

    /// Threads for a user, most recently active first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_threads(&self, user_id: &str) -> AppResult<Vec<ChatThreadRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {THREAD_COLUMNS} FROM chat_threads WHERE user_id = $1 \
             ORDER BY last_message_at DESC, rowid DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list threads: {e}")))?;

        Ok(rows.iter().map(ChatThreadRecord::from_row).collect())
    }

    /// Thread owned by `user_id`, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_thread_for_user(
        &self,
        thread_id: &str,
        user_id: &str,
    ) -> AppResult<Option<ChatThreadRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {THREAD_COLUMNS} FROM chat_threads WHERE id = $1 AND user_id = $2"
        ))
        .bind(thread_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get thread: {e}")))?;

        Ok(row.as_ref().map(ChatThreadRecord::from_row))
    }

    /// Bump the activity timestamps of a thread
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails
    pub async fn touch_thread(&self, thread_id: &str) -> AppResult<()> {
        let now = now_timestamp();
        sqlx::query("UPDATE chat_threads SET updated_at = $1, last_message_at = $1 WHERE id = $2")
            .bind(&now)
            .bind(thread_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to touch thread: {e}")))?;
        Ok(())
    }

    /// Insert a message and return its id
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn insert_message(&self, message: &NewChatMessage) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        let safety_flags = if message.safety_flags.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&message.safety_flags)?)
        };

        sqlx::query(&format!(
            "INSERT INTO chat_messages ({MESSAGE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(&id)
        .bind(&message.thread_id)
        .bind(&message.user_id)
        .bind(&message.role)
        .bind(&message.content)
        .bind(&message.model)
        .bind(json_text(&message.metadata))
        .bind(safety_flags)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save message: {e}")))?;

        Ok(id)
    }

    /// All messages of a thread in chronological order
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_messages(&self, thread_id: &str) -> AppResult<Vec<ChatMessageRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE thread_id = $1 \
             ORDER BY created_at, rowid"
        ))
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list messages: {e}")))?;

        Ok(rows.iter().map(ChatMessageRecord::from_row).collect())
    }

    /// The last `limit` messages, returned oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn recent_messages(
        &self,
        thread_id: &str,
        limit: i64,
    ) -> AppResult<Vec<ChatMessageRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE thread_id = $1 \
             ORDER BY created_at DESC, rowid DESC LIMIT $2"
        ))
        .bind(thread_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load recent messages: {e}")))?;

        let mut messages: Vec<ChatMessageRecord> =
            rows.iter().map(ChatMessageRecord::from_row).collect();
        messages.reverse();
        Ok(messages)
    }

    /// Most recent assistant message of a thread
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn last_assistant_message(
        &self,
        thread_id: &str,
    ) -> AppResult<Option<ChatMessageRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages \
             WHERE thread_id = $1 AND role = 'assistant' \
             ORDER BY created_at DESC, rowid DESC LIMIT 1"
        ))
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load last reply: {e}")))?;

        Ok(row.as_ref().map(ChatMessageRecord::from_row))
    }

    /// Replace the metadata of a message
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails
    pub async fn update_message_metadata(&self, message_id: &str, metadata: &Value) -> AppResult<()> {
        sqlx::query("UPDATE chat_messages SET metadata = $1 WHERE id = $2")
            .bind(json_text(metadata))
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update message: {e}")))?;
        Ok(())
    }

    /// Stored rolling summary of a thread
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn thread_summary(&self, thread_id: &str) -> AppResult<Option<String>> {
        sqlx::query_scalar("SELECT summary FROM chat_thread_summaries WHERE thread_id = $1")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to load thread summary: {e}")))
    }

    /// Store or replace the summary of a thread
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails
    pub async fn upsert_summary(&self, thread_id: &str, summary: &str) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO chat_thread_summaries (thread_id, summary, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT(thread_id) DO UPDATE SET
                summary = excluded.summary,
                updated_at = excluded.updated_at
            ",
        )
        .bind(thread_id)
        .bind(summary)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save thread summary: {e}")))?;
        Ok(())
    }
}
