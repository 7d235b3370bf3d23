// ABOUTME: Payment record storage for subscription and one-off purchase events
// ABOUTME: Rows mirror the payment provider identifiers sent by the client
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
    /// Create the payment records table
    ///
    /// # Errors
    ///
    /// Returns an error if table creation fails
    pub(super) async fn migrate_payments(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS payment_records (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                type TEXT NOT NULL,
                status TEXT NOT NULL,
                amount REAL,
                currency TEXT,
                stripe_customer_id TEXT,
                stripe_subscription_id TEXT,
                stripe_session_id TEXT,
                stripe_payment_intent_id TEXT,
                metadata TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_payment_records_user ON payment_records(user_id, created_at)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Stored payment event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_session_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub metadata: Value,
    pub created_at: String,
}

impl PaymentRecord {
    fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            kind: r.get("type"),
            status: r.get("status"),
            amount: r.get("amount"),
            currency: r.get("currency"),
            stripe_customer_id: r.get("stripe_customer_id"),
            stripe_subscription_id: r.get("stripe_subscription_id"),
            stripe_session_id: r.get("stripe_session_id"),
            stripe_payment_intent_id: r.get("stripe_payment_intent_id"),
            metadata: json_column(r, "metadata"),
            created_at: r.get("created_at"),
        }
    }
}

/// Payment event as received from the client
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPaymentRecord {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_session_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

const COLUMNS: &str = "id, user_id, type, status, amount, currency, stripe_customer_id, \
    stripe_subscription_id, stripe_session_id, stripe_payment_intent_id, metadata, created_at";

/// Payment record operations
pub struct PaymentManager {
    pool: SqlitePool,
}

impl PaymentManager {
    /// Create a new payment manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a payment record
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub async fn record(&self, payment: &NewPaymentRecord) -> AppResult<PaymentRecord> {
        let record = PaymentRecord {
            id: Uuid::new_v4().to_string(),
            user_id: payment.user_id.clone(),
            kind: payment.kind.clone(),
            status: payment.status.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            stripe_customer_id: payment.stripe_customer_id.clone(),
            stripe_subscription_id: payment.stripe_subscription_id.clone(),
            stripe_session_id: payment.stripe_session_id.clone(),
            stripe_payment_intent_id: payment.stripe_payment_intent_id.clone(),
            metadata: payment.metadata.clone(),
            created_at: now_timestamp(),
        };

        sqlx::query(&format!(
            "INSERT INTO payment_records ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.kind)
        .bind(&record.status)
        .bind(record.amount)
        .bind(&record.currency)
        .bind(&record.stripe_customer_id)
        .bind(&record.stripe_subscription_id)
        .bind(&record.stripe_session_id)
        .bind(&record.stripe_payment_intent_id)
        .bind(json_text(&record.metadata))
        .bind(&record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record payment: {e}")))?;

        Ok(record)
    }

    /// Payment records for a user, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_for_user(&self, user_id: &str, limit: i64) -> AppResult<Vec<PaymentRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM payment_records WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list payments: {e}")))?;

        Ok(rows.iter().map(PaymentRecord::from_row).collect())
    }
}
