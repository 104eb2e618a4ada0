use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{AppError, Result};
use super::dto::{PaymentStatus, PaymentTransaction, WebhookEvent, WebhookStatus};

/// Payment Store: exclusively owns Payment Transaction and Webhook Event records.
#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_for_order(&self, order_id: Uuid) -> Result<Option<PaymentTransaction>> {
        let row = sqlx::query(
            r#"SELECT id, order_id, external_id, invoice_id, invoice_url, amount,
                      payment_method, status, paid_at, expires_at
               FROM payment_transactions WHERE order_id = $1
               ORDER BY id DESC LIMIT 1"#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.as_ref().map(row_to_transaction))
    }

    pub async fn get_by_invoice_id(&self, invoice_id: &str) -> Result<Option<PaymentTransaction>> {
        let row = sqlx::query(
            r#"SELECT id, order_id, external_id, invoice_id, invoice_url, amount,
                      payment_method, status, paid_at, expires_at
               FROM payment_transactions WHERE invoice_id = $1"#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.as_ref().map(row_to_transaction))
    }

    pub async fn create(
        &self,
        order_id: Uuid,
        external_id: &str,
        amount: Decimal,
        invoice_id: &str,
        invoice_url: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PaymentTransaction> {
        let row = sqlx::query(
            r#"INSERT INTO payment_transactions
                (id, order_id, external_id, invoice_id, invoice_url, amount, status, expires_at)
               VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
               ON CONFLICT (external_id) DO NOTHING
               RETURNING id, order_id, external_id, invoice_id, invoice_url, amount,
                         payment_method, status, paid_at, expires_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(external_id)
        .bind(invoice_id)
        .bind(invoice_url)
        .bind(amount)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        match row {
            Some(row) => Ok(row_to_transaction(&row)),
            None => self
                .get_for_order(order_id)
                .await?
                .ok_or_else(|| AppError::Internal("payment transaction insert raced with no surviving row".into())),
        }
    }

    pub async fn mark_paid(
        &self,
        id: Uuid,
        paid_at: DateTime<Utc>,
        payment_method: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE payment_transactions SET status = 'paid', paid_at = $2, payment_method = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(paid_at)
        .bind(payment_method)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn mark_expired(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE payment_transactions SET status = 'expired' WHERE id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    /// Inserts a Webhook Event row. The `webhook_id` unique constraint is
    /// the idempotency mechanism: a duplicate insert surfaces as
    /// `AppError::DuplicateWebhook` rather than a generic database error.
    pub async fn insert_webhook_event(
        &self,
        webhook_id: &str,
        event_type: &str,
        payload: &str,
    ) -> Result<WebhookEvent> {
        let result = sqlx::query(
            r#"INSERT INTO webhook_events (id, webhook_id, event_type, payload, status)
               VALUES ($1, $2, $3, $4, 'pending')
               RETURNING id, webhook_id, event_type, status"#,
        )
        .bind(Uuid::new_v4())
        .bind(webhook_id)
        .bind(event_type)
        .bind(payload)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(WebhookEvent {
                id: row.get("id"),
                webhook_id: row.get("webhook_id"),
                event_type: row.get("event_type"),
                status: WebhookStatus::Pending,
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                Err(AppError::DuplicateWebhook)
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }

    pub async fn mark_webhook_processed(&self, webhook_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE webhook_events SET status = 'processed', processed_at = NOW() WHERE webhook_id = $1",
        )
        .bind(webhook_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn mark_webhook_failed(&self, webhook_id: &str) -> Result<()> {
        sqlx::query("UPDATE webhook_events SET status = 'failed' WHERE webhook_id = $1")
            .bind(webhook_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}

fn row_to_transaction(row: &sqlx::postgres::PgRow) -> PaymentTransaction {
    let status_str: String = row.get("status");
    PaymentTransaction {
        id: row.get("id"),
        order_id: row.get("order_id"),
        external_id: row.get("external_id"),
        invoice_id: row.get("invoice_id"),
        invoice_url: row.get("invoice_url"),
        amount: row.get("amount"),
        payment_method: row.get("payment_method"),
        status: PaymentStatus::from_db_str(&status_str).unwrap_or(PaymentStatus::Pending),
        paid_at: row.get("paid_at"),
        expires_at: row.get("expires_at"),
    }
}
